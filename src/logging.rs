use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Where log lines go.
pub enum LogTarget<'a> {
    File(&'a Path),
    Stderr,
    /// Interactive mode without a log file: anything on the terminal would
    /// tear the UI.
    Discard,
}

/// Runtime on/off switch for the installed subscriber.
pub struct LogSwitch {
    handle: reload::Handle<EnvFilter, Registry>,
    level: Level,
    enabled: bool,
}

impl LogSwitch {
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        if !enabled {
            info!("logging disabled");
        }
        if self.handle.reload(filter(self.level, enabled)).is_ok() {
            self.enabled = enabled;
        }
        if enabled {
            info!(level = %self.level, "logging enabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

pub fn level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Installs the global subscriber. `RUST_LOG` overrides the level while
/// logging is enabled.
pub fn init(level: Level, target: LogTarget<'_>, enabled: bool) -> Result<LogSwitch> {
    let (writer, ansi) = match target {
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        LogTarget::Stderr => (BoxMakeWriter::new(io::stderr), true),
        LogTarget::Discard => (BoxMakeWriter::new(io::sink), false),
    };

    let (filter_layer, handle) = reload::Layer::new(filter(level, enabled));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(LogSwitch {
        handle,
        level,
        enabled,
    })
}

fn filter(level: Level, enabled: bool) -> EnvFilter {
    if !enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gpu_sparkline={level}")))
}
