use std::time::Duration;

use crate::models::{Reading, Vendor};

use super::parse_int;

/// Utilization, temperature, used and total memory as bare numbers.
pub const QUERY_ARGV: [&str; 3] = [
    "nvidia-smi",
    "--query-gpu=utilization.gpu,temperature.gpu,memory.used,memory.total",
    "--format=csv,noheader,nounits",
];

pub const TIMEOUT: Duration = Duration::from_secs(5);

const ERROR_MARKERS: [&str; 2] = ["not found", "command not found"];

/// Parses nvidia-smi output into a reading.
///
/// Returns `None` when the output is empty, carries an error marker, or has
/// fewer than four comma-separated fields, so the caller can try the next
/// vendor. Individual fields that fail to parse become absent without
/// invalidating their siblings. Only the first GPU line is used.
pub fn parse(output: &str) -> Option<Reading> {
    let output = output.trim();
    if output.is_empty() || ERROR_MARKERS.iter().any(|m| output.contains(m)) {
        return None;
    }

    let line = output.lines().map(str::trim).find(|l| !l.is_empty())?;
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 4 {
        return None;
    }

    let mut reading = Reading::new(Vendor::Nvidia);
    reading.gpu_load = parse_int(parts[0]);
    reading.temperature = parse_int(parts[1]);
    reading.memory_used = memory_percent(parse_int(parts[2]), parse_int(parts[3]));
    Some(reading)
}

fn memory_percent(used: Option<i32>, total: Option<i32>) -> Option<i32> {
    match (used, total) {
        (Some(used), Some(total)) if total > 0 => {
            Some((f64::from(used) / f64::from(total) * 100.0).round() as i32)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_fields() {
        let reading = parse("45,67,2048,8192").unwrap();
        assert_eq!(reading.vendor, Vendor::Nvidia);
        assert_eq!(reading.gpu_load, Some(45));
        assert_eq!(reading.temperature, Some(67));
        assert_eq!(reading.memory_used, Some(25));
    }

    #[test]
    fn bad_field_only_drops_itself() {
        let reading = parse("45,abc,2048,8192").unwrap();
        assert_eq!(reading.gpu_load, Some(45));
        assert_eq!(reading.temperature, None);
        assert_eq!(reading.memory_used, Some(25));
    }

    #[test]
    fn tolerates_whitespace_and_trailing_newline() {
        let reading = parse(" 3,  41 , 1000 , 3000 \n").unwrap();
        assert_eq!(reading.gpu_load, Some(3));
        assert_eq!(reading.temperature, Some(41));
        assert_eq!(reading.memory_used, Some(33));
    }

    #[test]
    fn unsupported_sensor_is_absent() {
        let reading = parse("[N/A], 55, [N/A], 8192").unwrap();
        assert_eq!(reading.gpu_load, None);
        assert_eq!(reading.temperature, Some(55));
        assert_eq!(reading.memory_used, None);
    }

    #[test]
    fn zero_total_memory_is_absent() {
        assert_eq!(parse("1,2,3,0").unwrap().memory_used, None);
    }

    #[test]
    fn fewer_than_four_fields_is_rejected() {
        assert!(parse("45,67,2048").is_none());
        assert!(parse("").is_none());
        assert!(parse("   \n").is_none());
    }

    #[test]
    fn error_marker_is_rejected() {
        assert!(parse("bash: nvidia-smi: command not found").is_none());
        assert!(parse("a, b, c, library not found").is_none());
    }

    #[test]
    fn first_gpu_line_wins() {
        let reading = parse("10, 40, 100, 1000\n90, 80, 900, 1000\n").unwrap();
        assert_eq!(reading.gpu_load, Some(10));
        assert_eq!(reading.memory_used, Some(10));
    }
}
