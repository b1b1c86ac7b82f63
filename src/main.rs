mod app;
mod logging;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use gpu_sparkline::window::DEFAULT_CAPACITY;
use gpu_sparkline::{
    ConfigKey, ConfigStore, ConfigValue, DisplayConfig, Probe, Scheduler, VendorProbe,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use crate::app::App;
use crate::logging::LogTarget;

const FRAME: Duration = Duration::from_millis(100);

/// GPU load, temperature and memory as a label or live sparklines.
#[derive(Parser, Debug)]
#[command(name = "gpu-sparkline", version, about)]
struct Args {
    /// Seconds between samples (overrides the config file)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..=10))]
    interval: Option<u64>,

    /// Number of samples kept for the charts
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    history: usize,

    /// Settings file [default: <config dir>/gpu-sparkline.json]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override a setting for this run, e.g. --set show-chart=true
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_setting)]
    settings: Vec<(ConfigKey, ConfigValue)>,

    /// Print the label once per sample instead of drawing the dashboard
    #[arg(long)]
    plain: bool,

    /// Take one sample, print label and tooltip, and exit
    #[arg(long, conflicts_with = "plain")]
    once: bool,

    /// Append log output to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

fn parse_setting(raw: &str) -> Result<(ConfigKey, ConfigValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key: ConfigKey = key.trim().parse().map_err(|e| format!("{e}"))?;
    let value = ConfigValue::parse(value.trim())
        .ok_or_else(|| format!("`{value}` is neither a boolean nor an integer"))?;
    Ok((key, value))
}

/// Loads settings, keeping the failure for logging once the subscriber is up.
fn load_config(path: Option<&Path>) -> (DisplayConfig, Option<anyhow::Error>) {
    let Some(path) = path else {
        return (DisplayConfig::default(), None);
    };
    match DisplayConfig::load(path)
        .with_context(|| format!("failed to load settings from {}", path.display()))
    {
        Ok(config) => (config, None),
        Err(e) => (DisplayConfig::default(), Some(e)),
    }
}

/// Applies `--set`, `--interval` and `-v` for this run and returns the keys
/// they touched.
fn apply_overrides(config: &mut DisplayConfig, args: &Args) -> Result<Vec<ConfigKey>> {
    let mut touched = Vec::new();
    for (key, value) in &args.settings {
        config
            .set(*key, *value)
            .with_context(|| format!("invalid --set {key}={value}"))?;
        touched.push(*key);
    }
    if let Some(interval) = args.interval {
        config.set(ConfigKey::UpdateInterval, ConfigValue::Int(interval as i64))?;
        touched.push(ConfigKey::UpdateInterval);
    }
    if args.verbose > 0 {
        config.enable_logging = true;
        touched.push(ConfigKey::EnableLogging);
    }
    touched.dedup();
    Ok(touched)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().or_else(DisplayConfig::default_path);
    let (file_config, load_error) = load_config(config_path.as_deref());
    let mut config = file_config.clone();
    let overridden = apply_overrides(&mut config, &args)?;

    let target = match (&args.log_file, args.plain || args.once) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::Discard,
    };
    let log_switch = logging::init(
        logging::level(args.verbose, args.quiet),
        target,
        config.enable_logging,
    )?;
    if let Some(e) = load_error {
        warn!("using default settings: {e:#}");
    }

    let scheduler = Scheduler::new(VendorProbe::system(), args.history);
    if args.once {
        run_once(scheduler, &config);
        Ok(())
    } else if args.plain {
        run_plain(scheduler, &config).await
    } else {
        let app = App::new(
            scheduler,
            ConfigStore::new(config),
            config_path,
            Some(log_switch),
        )
        .keep_on_save(&file_config, &overridden);
        run_tui(app).await
    }
}

fn run_once<P: Probe>(mut scheduler: Scheduler<P>, config: &DisplayConfig) {
    let _ = scheduler.tick(config);
    let display = scheduler.display();
    println!("{}", display.label);
    println!("{}", display.tooltip);
}

/// Status-bar style output: one label per sample until Ctrl-C.
async fn run_plain<P: Probe>(mut scheduler: Scheduler<P>, config: &DisplayConfig) -> Result<()> {
    scheduler.start(config.update_period(), config);
    println!("{}", scheduler.display().label);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    while let Some(due) = scheduler.next_due() {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl-C")?;
                break;
            }
            _ = tokio::time::sleep_until(due.into()) => {
                if scheduler.poll(Instant::now(), config) {
                    println!("{}", scheduler.display().label);
                }
            }
        }
    }
    scheduler.stop();
    Ok(())
}

type Undo = Box<dyn FnOnce() -> io::Result<()>>;

/// Terminal setup steps that have succeeded so far. Dropping the guard (or
/// calling `restore`) undoes them newest first, each one even if another
/// failed.
#[derive(Default)]
struct TerminalGuard {
    undo: Vec<(&'static str, Undo)>,
}

impl TerminalGuard {
    fn enter(
        &mut self,
        what: &'static str,
        setup: impl FnOnce() -> io::Result<()>,
        undo: impl FnOnce() -> io::Result<()> + 'static,
    ) -> Result<()> {
        setup().with_context(|| format!("failed to enter {what}"))?;
        self.undo.push((what, Box::new(undo)));
        Ok(())
    }

    fn restore(&mut self) -> Result<()> {
        let mut first = None;
        while let Some((what, undo)) = self.undo.pop() {
            if let Err(e) = undo() {
                warn!(error = %e, "failed to leave {what}");
                if first.is_none() {
                    first = Some(anyhow::Error::new(e).context(format!("failed to leave {what}")));
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

async fn run_tui<P: Probe>(mut app: App<P>) -> Result<()> {
    let mut guard = TerminalGuard::default();
    guard.enter(
        "raw mode",
        crossterm::terminal::enable_raw_mode,
        crossterm::terminal::disable_raw_mode,
    )?;
    guard.enter(
        "alternate screen",
        || crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen),
        || crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen),
    )?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to create terminal")?;

    app.start();
    let result = event_loop(&mut terminal, &mut app).await;

    let restored = guard.restore();
    info!(samples = app.scheduler.ticks(), "exiting");

    result.and(restored)
}

async fn event_loop<P: Probe>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<P>,
) -> Result<()> {
    let mut frames = tokio::time::interval(FRAME);
    loop {
        frames.tick().await;
        app.update(Instant::now());

        terminal.draw(|f| ui::render(f, app))?;
        app.tick();

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn step(
        log: &Rc<RefCell<Vec<String>>>,
        name: &str,
        ok: bool,
    ) -> impl FnOnce() -> io::Result<()> + 'static {
        let log = Rc::clone(log);
        let name = name.to_string();
        move || {
            log.borrow_mut().push(name);
            if ok {
                Ok(())
            } else {
                Err(io::Error::other("tty gone"))
            }
        }
    }

    #[test]
    fn failed_setup_undoes_earlier_steps() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let mut guard = TerminalGuard::default();
            guard
                .enter("raw mode", step(&log, "raw on", true), step(&log, "raw off", true))
                .unwrap();
            let err = guard
                .enter("alternate screen", step(&log, "alt on", false), step(&log, "alt off", true))
                .unwrap_err();
            assert!(err.to_string().contains("alternate screen"));
        }
        assert_eq!(*log.borrow(), ["raw on", "alt on", "raw off"]);
    }

    #[test]
    fn restore_runs_every_step_and_keeps_the_first_error() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut guard = TerminalGuard::default();
        guard
            .enter("raw mode", step(&log, "raw on", true), step(&log, "raw off", true))
            .unwrap();
        guard
            .enter("alternate screen", step(&log, "alt on", true), step(&log, "alt off", false))
            .unwrap();

        let err = guard.restore().unwrap_err();
        assert!(err.to_string().contains("alternate screen"));
        assert_eq!(*log.borrow(), ["raw on", "alt on", "alt off", "raw off"]);

        guard.restore().unwrap();
        drop(guard);
        assert_eq!(log.borrow().len(), 4);
    }

    #[test]
    fn parses_settings() {
        assert_eq!(
            parse_setting("show-chart=true"),
            Ok((ConfigKey::ShowChart, ConfigValue::Bool(true)))
        );
        assert_eq!(
            parse_setting("chart-width = 80"),
            Ok((ConfigKey::ChartWidth, ConfigValue::Int(80)))
        );
        assert!(parse_setting("show-chart").is_err());
        assert!(parse_setting("bogus=1").is_err());
        assert!(parse_setting("chart-width=wide").is_err());
    }

    #[test]
    fn overrides_are_validated() {
        let args = Args::parse_from(["gpu-sparkline", "--set", "chart-width=500"]);
        let mut config = DisplayConfig::default();
        assert!(apply_overrides(&mut config, &args).is_err());

        let args = Args::parse_from(["gpu-sparkline", "-i", "5", "--set", "show-memory=false"]);
        let mut config = DisplayConfig::default();
        let touched = apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.update_interval, 5);
        assert!(!config.show_memory);
        assert_eq!(
            touched,
            vec![ConfigKey::ShowMemory, ConfigKey::UpdateInterval]
        );
    }

    #[test]
    fn verbose_turns_logging_on_for_the_run() {
        let args = Args::parse_from(["gpu-sparkline", "-v"]);
        let mut config = DisplayConfig::default();
        let touched = apply_overrides(&mut config, &args).unwrap();
        assert!(config.enable_logging);
        assert_eq!(touched, vec![ConfigKey::EnableLogging]);
    }

    #[test]
    fn interval_flag_is_range_checked() {
        assert!(Args::try_parse_from(["gpu-sparkline", "--interval", "0"]).is_err());
        assert!(Args::try_parse_from(["gpu-sparkline", "--once", "--plain"]).is_err());
    }

    #[test]
    fn missing_settings_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let (config, error) = load_config(Some(path.as_path()));
        assert_eq!(config, DisplayConfig::default());
        assert!(error.is_none());
    }

    #[test]
    fn broken_settings_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        let (config, error) = load_config(Some(path.as_path()));
        assert_eq!(config, DisplayConfig::default());
        assert!(error.is_some());
    }
}
