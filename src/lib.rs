//! GPU telemetry sampling and sparkline rendering.
//!
//! The pipeline runs once per scheduler tick:
//! [`VendorProbe`] → [`SampleWindow`] → [`DisplayFormatter`] and
//! [`ChartRenderer`]. Process execution and drawing are reached through the
//! [`CommandRunner`] and [`Surface`] traits so hosts can supply their own.

pub mod config;
pub mod format;
pub mod models;
pub mod probe;
pub mod render;
pub mod scheduler;
pub mod theme;
pub mod window;

pub use config::{ConfigChanges, ConfigError, ConfigKey, ConfigStore, ConfigValue, DisplayConfig};
pub use format::DisplayFormatter;
pub use models::{Channel, Reading, Vendor};
pub use probe::{CommandOutput, CommandRunner, Probe, SystemRunner, VendorProbe};
pub use render::{ChartRenderer, ChartSeries, DetailChart, Surface};
pub use scheduler::{DisplayState, Scheduler, SchedulerState};
pub use window::SampleWindow;
