use std::time::Duration;

use crate::models::{Reading, Vendor};

/// One frame of radeontop output on stdout.
pub const SAMPLE_ARGV: [&str; 5] = ["radeontop", "-d", "-", "-l", "1"];

pub const TIMEOUT: Duration = Duration::from_secs(3);

/// Extracts load, temperature and VRAM usage from a radeontop frame.
///
/// Each field is matched on its own; the reading is returned when at least
/// one of them was found.
pub fn parse(output: &str) -> Option<Reading> {
    let gpu = percent_after(output, "gpu");
    let temperature = celsius(output);
    let vram = percent_after(output, "vram");

    if gpu.is_none() && temperature.is_none() && vram.is_none() {
        return None;
    }

    let mut reading = Reading::new(Vendor::Amd);
    reading.gpu_load = gpu.map(round);
    reading.temperature = temperature.map(round);
    reading.memory_used = vram.map(round);
    Some(reading)
}

fn round(value: f64) -> i32 {
    value.round() as i32
}

/// First `<keyword><whitespace><number>%` in the text.
fn percent_after(text: &str, keyword: &str) -> Option<f64> {
    text.match_indices(keyword).find_map(|(at, _)| {
        let rest = &text[at + keyword.len()..];
        let number = rest.trim_start();
        if number.len() == rest.len() {
            return None;
        }
        let (value, len) = leading_number(number)?;
        number[len..].starts_with('%').then_some(value)
    })
}

/// First `<number>C` in the text.
fn celsius(text: &str) -> Option<f64> {
    text.match_indices('C').find_map(|(at, _)| {
        let head = &text[..at];
        let start = head
            .char_indices()
            .rev()
            .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
            .map_or(0, |(i, c)| i + c.len_utf8());
        let candidate = &head[start..];
        // Matches start on a digit, so ".5C" reads as 5.
        let first_digit = candidate.find(|c: char| c.is_ascii_digit())?;
        let (value, len) = leading_number(&candidate[first_digit..])?;
        (first_digit + len == candidate.len()).then_some(value)
    })
}

/// Parses `digits[.digits]` from the start of `s`, returning the value and
/// the number of bytes consumed.
fn leading_number(s: &str) -> Option<(f64, usize)> {
    let int_len = s.bytes().take_while(u8::is_ascii_digit).count();
    if int_len == 0 {
        return None;
    }
    let mut len = int_len;
    if s[len..].starts_with('.') {
        let frac_len = s[len + 1..].bytes().take_while(u8::is_ascii_digit).count();
        if frac_len > 0 {
            len += 1 + frac_len;
        }
    }
    s[..len].parse().ok().map(|v| (v, len))
}
