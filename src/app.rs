use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::KeyCode;
use gpu_sparkline::{
    ConfigChanges, ConfigError, ConfigKey, ConfigStore, ConfigValue, DisplayConfig, Probe,
    Scheduler,
};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::logging::LogSwitch;
use crate::ui::PanelCache;

const TRANSPARENCY_STEP: i64 = 10;

/// Main application state
pub struct App<P> {
    pub scheduler: Scheduler<P>,
    pub config: DisplayConfig,
    pub status: Option<String>,
    pub panel: PanelCache,
    pub frame_count: u64,
    pub should_quit: bool,
    store: ConfigStore,
    config_rx: watch::Receiver<DisplayConfig>,
    config_path: Option<PathBuf>,
    /// File values of settings overridden on the command line.
    pinned: Vec<(ConfigKey, ConfigValue)>,
    logging: Option<LogSwitch>,
}

impl<P: Probe> App<P> {
    pub fn new(
        scheduler: Scheduler<P>,
        store: ConfigStore,
        config_path: Option<PathBuf>,
        logging: Option<LogSwitch>,
    ) -> Self {
        let config_rx = store.subscribe();
        App {
            scheduler,
            config: store.current(),
            status: None,
            panel: PanelCache::default(),
            frame_count: 0,
            should_quit: false,
            store,
            config_rx,
            config_path,
            pinned: Vec::new(),
            logging,
        }
    }

    /// Makes `save` write the file's own values for `keys` until they are
    /// changed from the keyboard.
    pub fn keep_on_save(mut self, file: &DisplayConfig, keys: &[ConfigKey]) -> Self {
        self.pinned = keys.iter().map(|&key| (key, file.get(key))).collect();
        self
    }

    /// Begins sampling with the configured interval.
    pub fn start(&mut self) {
        self.scheduler.start(self.config.update_period(), &self.config);
        self.collect_chart_redraw();
    }

    /// Applies pending settings changes and samples when due.
    pub fn update(&mut self, now: Instant) -> bool {
        self.apply_config_changes();
        let ticked = self.scheduler.poll(now, &self.config);
        self.collect_chart_redraw();
        ticked
    }

    /// Invalidates the cached sparklines once the scheduler asks for it.
    fn collect_chart_redraw(&mut self) {
        if self.scheduler.take_chart_redraw() {
            self.panel.invalidate();
        }
    }

    /// Reacts to whatever changed in the store since the last call.
    pub fn apply_config_changes(&mut self) -> ConfigChanges {
        if !self.config_rx.has_changed().unwrap_or(false) {
            return ConfigChanges::default();
        }
        let new = self.config_rx.borrow_and_update().clone();
        let changes = ConfigChanges::between(&self.config, &new);
        self.config = new;

        if changes.interval {
            self.scheduler.set_period(self.config.update_period());
        }
        if changes.logging {
            if let Some(logging) = &mut self.logging {
                logging.set_enabled(self.config.enable_logging);
            }
        }
        if changes.any() {
            self.scheduler.refresh(&self.config);
        }
        changes
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        let result = match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Ok(())
            }
            KeyCode::Char('c') => self.toggle(ConfigKey::ShowChart, "chart mode"),
            KeyCode::Char('g') => self.toggle(ConfigKey::ShowGpuLoad, "gpu load"),
            KeyCode::Char('t') => self.toggle(ConfigKey::ShowTemperature, "temperature"),
            KeyCode::Char('m') => self.toggle(ConfigKey::ShowMemory, "memory"),
            KeyCode::Char('l') => self.toggle(ConfigKey::EnableLogging, "logging"),
            KeyCode::Char('+') | KeyCode::Char('=') => self.step(ConfigKey::UpdateInterval, 1),
            KeyCode::Char('-') => self.step(ConfigKey::UpdateInterval, -1),
            KeyCode::Char(']') => self.step(ConfigKey::ChartTransparency, TRANSPARENCY_STEP),
            KeyCode::Char('[') => self.step(ConfigKey::ChartTransparency, -TRANSPARENCY_STEP),
            KeyCode::Char('p') => {
                self.toggle_pause();
                Ok(())
            }
            KeyCode::Char('s') => {
                self.save();
                Ok(())
            }
            _ => Ok(()),
        };
        if let Err(e) = result {
            warn!(error = %e, "setting rejected");
            self.status = Some(e.to_string());
        }
        self.apply_config_changes();
        self.collect_chart_redraw();
    }

    fn toggle(&mut self, key: ConfigKey, what: &str) -> Result<(), ConfigError> {
        let on = self.store.toggle(key)?;
        self.unpin(key);
        self.status = Some(format!("{what}: {}", if on { "on" } else { "off" }));
        Ok(())
    }

    fn step(&mut self, key: ConfigKey, delta: i64) -> Result<(), ConfigError> {
        let value = self.store.step(key, delta)?;
        self.unpin(key);
        self.status = Some(format!("{key} = {value}"));
        Ok(())
    }

    fn unpin(&mut self, key: ConfigKey) {
        self.pinned.retain(|(k, _)| *k != key);
    }

    /// Current settings with command-line overrides swapped back out.
    fn persisted(&self) -> Result<DisplayConfig, ConfigError> {
        let mut config = self.config.clone();
        for &(key, value) in &self.pinned {
            config.set(key, value)?;
        }
        Ok(config)
    }

    fn toggle_pause(&mut self) {
        if self.scheduler.is_running() {
            self.scheduler.stop();
            self.status = Some("paused".to_string());
        } else {
            self.start();
            self.status = Some("resumed".to_string());
        }
    }

    fn save(&mut self) {
        let Some(path) = &self.config_path else {
            self.status = Some("no config path".to_string());
            return;
        };
        self.status = Some(match self.persisted().and_then(|c| c.save(path)) {
            Ok(()) => {
                info!(path = %path.display(), "settings saved");
                format!("saved {}", path.display())
            }
            Err(e) => {
                warn!(error = %e, "failed to save settings");
                format!("save failed: {e}")
            }
        });
    }

    /// Increment frame counter
    pub fn tick(&mut self) {
        self.frame_count += 1;
    }
}
