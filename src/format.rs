use crate::config::DisplayConfig;
use crate::models::{Channel, Reading};

/// Shown when no enabled field has a value.
pub const PLACEHOLDER: &str = "GPU: --";

const TOOLTIP_TITLE: &str = "GPU Monitor";

/// Turns a reading into the compact label and the multi-line tooltip.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisplayFormatter;

impl DisplayFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Enabled, present fields in fixed order, joined with `" | "`.
    pub fn format_label(&self, reading: &Reading, config: &DisplayConfig) -> String {
        let parts: Vec<String> = config
            .enabled_channels()
            .filter_map(|channel| {
                reading
                    .value(channel)
                    .map(|value| short_field(channel, value))
            })
            .collect();

        if parts.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            parts.join(" | ")
        }
    }

    /// Title line, vendor line for real vendors, then one line per present
    /// field regardless of visibility settings.
    pub fn format_tooltip(&self, reading: &Reading) -> String {
        let mut lines = vec![TOOLTIP_TITLE.to_string()];
        if reading.vendor.is_real() {
            lines.push(format!("Vendor: {}", reading.vendor));
        }
        for channel in Channel::ALL {
            if let Some(value) = reading.value(channel) {
                lines.push(long_field(channel, value));
            }
        }
        lines.join("\n")
    }
}

fn short_field(channel: Channel, value: i32) -> String {
    match channel {
        Channel::GpuLoad => format!("G: {value}%"),
        Channel::Temperature => format!("T: {value}°C"),
        Channel::Memory => format!("M: {value}%"),
    }
}

fn long_field(channel: Channel, value: i32) -> String {
    match channel {
        Channel::GpuLoad => format!("GPU Load: {value}%"),
        Channel::Temperature => format!("Temperature: {value}°C"),
        Channel::Memory => format!("Memory: {value}%"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Vendor;

    fn reading(load: Option<i32>, temp: Option<i32>, mem: Option<i32>, vendor: Vendor) -> Reading {
        let mut reading = Reading::new(vendor);
        reading.gpu_load = load;
        reading.temperature = temp;
        reading.memory_used = mem;
        reading
    }

    #[test]
    fn label_lists_enabled_present_fields() {
        let r = reading(Some(45), Some(67), Some(25), Vendor::Nvidia);
        let label = DisplayFormatter::new().format_label(&r, &DisplayConfig::default());
        assert_eq!(label, "G: 45% | T: 67°C | M: 25%");
    }

    #[test]
    fn label_with_only_temperature() {
        let config = DisplayConfig {
            show_gpu_load: false,
            ..DisplayConfig::default()
        };
        let r = reading(None, Some(30), None, Vendor::Amd);
        assert_eq!(DisplayFormatter::new().format_label(&r, &config), "T: 30°C");
    }

    #[test]
    fn label_skips_absent_fields() {
        let r = reading(Some(5), None, Some(9), Vendor::Nvidia);
        let label = DisplayFormatter::new().format_label(&r, &DisplayConfig::default());
        assert_eq!(label, "G: 5% | M: 9%");
    }

    #[test]
    fn label_placeholder_when_nothing_to_show() {
        let config = DisplayConfig {
            show_gpu_load: false,
            show_temperature: false,
            show_memory: false,
            ..DisplayConfig::default()
        };
        let r = reading(Some(45), Some(67), Some(25), Vendor::Nvidia);
        let formatter = DisplayFormatter::new();
        assert_eq!(formatter.format_label(&r, &config), "GPU: --");
        assert_eq!(
            formatter.format_label(&Reading::unknown(), &DisplayConfig::default()),
            "GPU: --"
        );
    }

    #[test]
    fn tooltip_for_real_vendor() {
        let r = reading(Some(45), Some(67), Some(25), Vendor::Nvidia);
        assert_eq!(
            DisplayFormatter::new().format_tooltip(&r),
            "GPU Monitor\nVendor: NVIDIA\nGPU Load: 45%\nTemperature: 67°C\nMemory: 25%"
        );
    }

    #[test]
    fn tooltip_hides_unknown_and_error_vendors() {
        let formatter = DisplayFormatter::new();
        assert_eq!(formatter.format_tooltip(&Reading::unknown()), "GPU Monitor");
        assert_eq!(formatter.format_tooltip(&Reading::error()), "GPU Monitor");
    }
}
