use std::fmt;

use chrono::{DateTime, Utc};

use crate::render::Rgba;

/// Which acquisition path produced a reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vendor {
    Nvidia,
    Amd,
    Unknown,
    Error,
}

impl Vendor {
    /// True for vendors that actually answered a probe.
    pub fn is_real(self) -> bool {
        matches!(self, Vendor::Nvidia | Vendor::Amd)
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Vendor::Nvidia => "NVIDIA",
            Vendor::Amd => "AMD",
            Vendor::Unknown => "Unknown",
            Vendor::Error => "Error",
        };
        f.write_str(name)
    }
}

/// One sampled snapshot. `None` means the sensor did not answer or its
/// value could not be parsed, which is distinct from a reading of zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub gpu_load: Option<i32>,
    pub temperature: Option<i32>,
    pub memory_used: Option<i32>,
    pub vendor: Vendor,
}

impl Reading {
    pub fn new(vendor: Vendor) -> Self {
        Self {
            timestamp: Utc::now(),
            gpu_load: None,
            temperature: None,
            memory_used: None,
            vendor,
        }
    }

    pub fn unknown() -> Self {
        Self::new(Vendor::Unknown)
    }

    pub fn error() -> Self {
        Self::new(Vendor::Error)
    }

    pub fn value(&self, channel: Channel) -> Option<i32> {
        match channel {
            Channel::GpuLoad => self.gpu_load,
            Channel::Temperature => self.temperature,
            Channel::Memory => self.memory_used,
        }
    }

    pub fn has_any_value(&self) -> bool {
        Channel::ALL.iter().any(|c| self.value(*c).is_some())
    }
}

/// One scalar field projected across the sample window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    GpuLoad,
    Temperature,
    Memory,
}

impl Channel {
    /// Display order used by the label, the tooltip and the chart strip.
    pub const ALL: [Channel; 3] = [Channel::GpuLoad, Channel::Temperature, Channel::Memory];

    /// Single-character label drawn on the sparkline.
    pub fn short_label(self) -> &'static str {
        match self {
            Channel::GpuLoad => "g",
            Channel::Temperature => "t",
            Channel::Memory => "m",
        }
    }

    /// Legend text used by the detail chart.
    pub fn long_name(self) -> &'static str {
        match self {
            Channel::GpuLoad => "GPU Load (%)",
            Channel::Temperature => "Temperature (°C)",
            Channel::Memory => "Memory (%)",
        }
    }

    /// Unit suffix for the sparkline value label.
    pub fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "°",
            _ => "%",
        }
    }

    pub fn color(self) -> Rgba {
        match self {
            Channel::GpuLoad => Rgba::rgb(0.3, 0.7, 1.0),
            Channel::Temperature => Rgba::rgb(1.0, 0.5, 0.2),
            Channel::Memory => Rgba::rgb(0.2, 0.8, 0.2),
        }
    }
}
