//! Display configuration and its observable store.
//!
//! The configuration is a plain value. Hosts mutate it through a
//! [`ConfigStore`] using the applet's kebab-case setting keys, and observe
//! changes through a `watch` channel.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::models::Channel;

const FILE_NAME: &str = "gpu-sparkline.json";

/// Visibility flags and rendering parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DisplayConfig {
    pub show_gpu_load: bool,
    pub show_temperature: bool,
    pub show_memory: bool,
    /// Charts instead of the text label.
    pub show_chart: bool,
    /// Panel chart size in pixels.
    pub chart_width: u16,
    pub chart_height: u16,
    /// Percentages, 0 is fully transparent.
    pub chart_transparency: u8,
    pub background_transparency: u8,
    pub chart_font_size: u8,
    pub enable_logging: bool,
    /// Seconds between samples.
    pub update_interval: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_gpu_load: true,
            show_temperature: true,
            show_memory: true,
            show_chart: false,
            chart_width: 50,
            chart_height: 24,
            chart_transparency: 50,
            background_transparency: 80,
            chart_font_size: 10,
            enable_logging: false,
            update_interval: 2,
        }
    }
}

impl DisplayConfig {
    pub fn shows(&self, channel: Channel) -> bool {
        match channel {
            Channel::GpuLoad => self.show_gpu_load,
            Channel::Temperature => self.show_temperature,
            Channel::Memory => self.show_memory,
        }
    }

    /// Visible channels in display order.
    pub fn enabled_channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(|c| self.shows(*c))
    }

    pub fn update_period(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        use ConfigKey::*;
        match key {
            ShowGpuLoad => ConfigValue::Bool(self.show_gpu_load),
            ShowTemperature => ConfigValue::Bool(self.show_temperature),
            ShowMemory => ConfigValue::Bool(self.show_memory),
            ShowChart => ConfigValue::Bool(self.show_chart),
            EnableLogging => ConfigValue::Bool(self.enable_logging),
            ChartWidth => ConfigValue::Int(i64::from(self.chart_width)),
            ChartHeight => ConfigValue::Int(i64::from(self.chart_height)),
            ChartTransparency => ConfigValue::Int(i64::from(self.chart_transparency)),
            BackgroundTransparency => ConfigValue::Int(i64::from(self.background_transparency)),
            ChartFontSize => ConfigValue::Int(i64::from(self.chart_font_size)),
            UpdateInterval => ConfigValue::Int(self.update_interval as i64),
        }
    }

    /// Sets one field after checking its type and range. Returns whether
    /// the value changed.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<bool, ConfigError> {
        use ConfigKey::*;
        let before = self.get(key);
        match key {
            ShowGpuLoad => self.show_gpu_load = value.as_bool(key)?,
            ShowTemperature => self.show_temperature = value.as_bool(key)?,
            ShowMemory => self.show_memory = value.as_bool(key)?,
            ShowChart => self.show_chart = value.as_bool(key)?,
            EnableLogging => self.enable_logging = value.as_bool(key)?,
            ChartWidth => self.chart_width = value.in_range(key)? as u16,
            ChartHeight => self.chart_height = value.in_range(key)? as u16,
            ChartTransparency => self.chart_transparency = value.in_range(key)? as u8,
            BackgroundTransparency => self.background_transparency = value.in_range(key)? as u8,
            ChartFontSize => self.chart_font_size = value.in_range(key)? as u8,
            UpdateInterval => self.update_interval = value.in_range(key)? as u64,
        }
        Ok(self.get(key) != before)
    }

    /// Checks every numeric field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for key in ConfigKey::ALL {
            if let ConfigValue::Int(_) = self.get(key) {
                self.get(key).in_range(key)?;
            }
        }
        Ok(())
    }

    /// Reads a JSON config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    /// `$XDG_CONFIG_HOME/gpu-sparkline.json` or the platform equivalent.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(FILE_NAME))
    }
}

/// Setting names, spelled as in the applet settings schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ShowGpuLoad,
    ShowTemperature,
    ShowMemory,
    ShowChart,
    ChartWidth,
    ChartHeight,
    ChartTransparency,
    BackgroundTransparency,
    ChartFontSize,
    EnableLogging,
    UpdateInterval,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::ShowGpuLoad,
        ConfigKey::ShowTemperature,
        ConfigKey::ShowMemory,
        ConfigKey::ShowChart,
        ConfigKey::ChartWidth,
        ConfigKey::ChartHeight,
        ConfigKey::ChartTransparency,
        ConfigKey::BackgroundTransparency,
        ConfigKey::ChartFontSize,
        ConfigKey::EnableLogging,
        ConfigKey::UpdateInterval,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::ShowGpuLoad => "show-gpu-load",
            ConfigKey::ShowTemperature => "show-temperature",
            ConfigKey::ShowMemory => "show-memory",
            ConfigKey::ShowChart => "show-chart",
            ConfigKey::ChartWidth => "chart-width",
            ConfigKey::ChartHeight => "chart-height",
            ConfigKey::ChartTransparency => "chart-transparency",
            ConfigKey::BackgroundTransparency => "background-transparency",
            ConfigKey::ChartFontSize => "chart-font-size",
            ConfigKey::EnableLogging => "enable-logging",
            ConfigKey::UpdateInterval => "update-interval",
        }
    }

    /// Inclusive bounds for numeric settings.
    pub fn range(self) -> Option<(i64, i64)> {
        match self {
            ConfigKey::ChartWidth => Some((30, 100)),
            ConfigKey::ChartHeight => Some((8, 96)),
            ConfigKey::ChartTransparency | ConfigKey::BackgroundTransparency => Some((0, 100)),
            ConfigKey::ChartFontSize => Some((6, 16)),
            ConfigKey::UpdateInterval => Some((1, 10)),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
}

impl ConfigValue {
    /// Parses `true`/`false` or an integer.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "true" => Some(ConfigValue::Bool(true)),
            "false" => Some(ConfigValue::Bool(false)),
            other => other.parse().ok().map(ConfigValue::Int),
        }
    }

    fn as_bool(self, key: ConfigKey) -> Result<bool, ConfigError> {
        match self {
            ConfigValue::Bool(b) => Ok(b),
            ConfigValue::Int(_) => Err(ConfigError::TypeMismatch {
                key,
                expected: "boolean",
            }),
        }
    }

    fn in_range(self, key: ConfigKey) -> Result<i64, ConfigError> {
        let ConfigValue::Int(value) = self else {
            return Err(ConfigError::TypeMismatch {
                key,
                expected: "integer",
            });
        };
        let (min, max) = key.range().unwrap_or((i64::MIN, i64::MAX));
        if value < min || value > max {
            return Err(ConfigError::OutOfRange {
                key,
                value,
                min,
                max,
            });
        }
        Ok(value)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(i) => write!(f, "{i}"),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    UnknownKey(String),
    TypeMismatch { key: ConfigKey, expected: &'static str },
    OutOfRange { key: ConfigKey, value: i64, min: i64, max: i64 },
    Io(io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownKey(key) => write!(f, "unknown setting '{key}'"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "setting '{key}' expects a {expected}")
            }
            ConfigError::OutOfRange {
                key,
                value,
                min,
                max,
            } => write!(f, "setting '{key}' = {value} is outside {min}..={max}"),
            ConfigError::Io(e) => write!(f, "config file I/O failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config file is not valid: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

/// Observable holder of the current [`DisplayConfig`].
///
/// Subscribers are only woken when a value actually changes.
#[derive(Debug)]
pub struct ConfigStore {
    tx: watch::Sender<DisplayConfig>,
}

impl ConfigStore {
    pub fn new(config: DisplayConfig) -> Self {
        let (tx, _rx) = watch::channel(config);
        Self { tx }
    }

    pub fn current(&self) -> DisplayConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayConfig> {
        self.tx.subscribe()
    }

    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        self.tx.borrow().get(key)
    }

    pub fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<bool, ConfigError> {
        let mut result = Ok(false);
        self.tx.send_if_modified(|config| {
            result = config.set(key, value);
            matches!(result, Ok(true))
        });
        if let Ok(true) = result {
            debug!(%key, %value, "setting changed");
        }
        result
    }

    /// Flips a boolean setting and returns its new value.
    pub fn toggle(&self, key: ConfigKey) -> Result<bool, ConfigError> {
        let current = self.get(key).as_bool(key)?;
        self.set(key, ConfigValue::Bool(!current))?;
        Ok(!current)
    }

    /// Moves a numeric setting by `delta`, saturating at its bounds.
    pub fn step(&self, key: ConfigKey, delta: i64) -> Result<i64, ConfigError> {
        let ConfigValue::Int(current) = self.get(key) else {
            return Err(ConfigError::TypeMismatch {
                key,
                expected: "integer",
            });
        };
        let (min, max) = key.range().unwrap_or((i64::MIN, i64::MAX));
        let next = current.saturating_add(delta).clamp(min, max);
        self.set(key, ConfigValue::Int(next))?;
        Ok(next)
    }

    /// Replaces the whole configuration after validating it.
    pub fn replace(&self, config: DisplayConfig) -> Result<bool, ConfigError> {
        config.validate()?;
        Ok(self.tx.send_if_modified(|current| {
            if *current == config {
                return false;
            }
            *current = config;
            true
        }))
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(DisplayConfig::default())
    }
}

/// What kind of reaction a configuration change needs from the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigChanges {
    pub interval: bool,
    pub logging: bool,
    pub mode: bool,
    pub visual: bool,
}

impl ConfigChanges {
    pub fn between(old: &DisplayConfig, new: &DisplayConfig) -> Self {
        Self {
            interval: old.update_interval != new.update_interval,
            logging: old.enable_logging != new.enable_logging,
            mode: old.show_chart != new.show_chart,
            visual: old.show_gpu_load != new.show_gpu_load
                || old.show_temperature != new.show_temperature
                || old.show_memory != new.show_memory
                || old.chart_width != new.chart_width
                || old.chart_height != new.chart_height
                || old.chart_transparency != new.chart_transparency
                || old.background_transparency != new.background_transparency
                || old.chart_font_size != new.chart_font_size,
        }
    }

    pub fn any(&self) -> bool {
        self.interval || self.logging || self.mode || self.visual
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_applet() {
        let config = DisplayConfig::default();
        assert!(config.show_gpu_load && config.show_temperature && config.show_memory);
        assert!(!config.show_chart);
        assert_eq!(config.chart_transparency, 50);
        assert_eq!(config.background_transparency, 80);
        assert_eq!(config.update_period(), Duration::from_secs(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn keys_round_trip_through_names() {
        for key in ConfigKey::ALL {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), key);
        }
        assert!(matches!(
            "chart-colour".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn set_checks_type_and_range() {
        let mut config = DisplayConfig::default();
        assert!(matches!(
            config.set(ConfigKey::ShowChart, ConfigValue::Int(1)),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            config.set(ConfigKey::ChartTransparency, ConfigValue::Int(101)),
            Err(ConfigError::OutOfRange { value: 101, .. })
        ));
        assert_eq!(config.chart_transparency, 50);
        assert!(config
            .set(ConfigKey::ChartTransparency, ConfigValue::Int(0))
            .unwrap());
        assert!(!config
            .set(ConfigKey::ChartTransparency, ConfigValue::Int(0))
            .unwrap());
    }

    #[test]
    fn enabled_channels_keep_display_order() {
        let config = DisplayConfig {
            show_gpu_load: false,
            ..DisplayConfig::default()
        };
        let channels: Vec<_> = config.enabled_channels().collect();
        assert_eq!(channels, vec![Channel::Temperature, Channel::Memory]);
    }

    #[test]
    fn store_notifies_only_on_real_changes() {
        let store = ConfigStore::default();
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store
            .set(ConfigKey::ShowMemory, ConfigValue::Bool(true))
            .unwrap();
        assert!(!rx.has_changed().unwrap());

        store
            .set(ConfigKey::ShowMemory, ConfigValue::Bool(false))
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().show_memory);

        assert!(store
            .set(ConfigKey::UpdateInterval, ConfigValue::Int(0))
            .is_err());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn toggle_and_step() {
        let store = ConfigStore::default();
        assert!(store.toggle(ConfigKey::ShowChart).unwrap());
        assert!(store.current().show_chart);
        assert_eq!(store.step(ConfigKey::UpdateInterval, 20).unwrap(), 10);
        assert_eq!(store.step(ConfigKey::UpdateInterval, -20).unwrap(), 1);
        assert!(store.toggle(ConfigKey::ChartWidth).is_err());
    }

    #[test]
    fn changes_are_classified() {
        let old = DisplayConfig::default();
        let new = DisplayConfig {
            update_interval: 5,
            chart_font_size: 12,
            ..old.clone()
        };
        let changes = ConfigChanges::between(&old, &new);
        assert!(changes.interval && changes.visual);
        assert!(!changes.logging && !changes.mode);
        assert!(!ConfigChanges::between(&old, &old).any());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(FILE_NAME);
        let config = DisplayConfig {
            show_chart: true,
            chart_width: 80,
            ..DisplayConfig::default()
        };
        config.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"chart-width\": 80"));
        assert_eq!(DisplayConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DisplayConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, DisplayConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, r#"{ "show-memory": false }"#).unwrap();
        let config = DisplayConfig::load(&path).unwrap();
        assert!(!config.show_memory);
        assert_eq!(config.chart_width, 50);
    }

    #[test]
    fn bad_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, r#"{ "chart-font-size": 40 }"#).unwrap();
        assert!(matches!(
            DisplayConfig::load(&path),
            Err(ConfigError::OutOfRange { .. })
        ));
        fs::write(&path, r#"{ "colour": "red" }"#).unwrap();
        assert!(matches!(
            DisplayConfig::load(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
