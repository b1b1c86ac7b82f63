use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::config::DisplayConfig;
use crate::format::{DisplayFormatter, PLACEHOLDER};
use crate::models::Reading;
use crate::probe::Probe;
use crate::window::SampleWindow;

const MIN_PERIOD: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Text outputs of the latest tick, plus whether charts need a repaint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayState {
    pub label: String,
    pub tooltip: String,
    pub charts_dirty: bool,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            label: PLACEHOLDER.to_string(),
            tooltip: "GPU Monitor".to_string(),
            charts_dirty: false,
        }
    }
}

/// Drives sampling on a fixed period and owns the sample window.
///
/// Ticks never overlap: the host calls [`Scheduler::poll`] from its own
/// loop, and each tick runs the probe to completion before returning.
pub struct Scheduler<P> {
    probe: P,
    window: SampleWindow,
    formatter: DisplayFormatter,
    state: SchedulerState,
    period: Duration,
    last_tick: Option<Instant>,
    display: DisplayState,
    ticks: u64,
}

impl<P: Probe> Scheduler<P> {
    pub fn new(probe: P, capacity: usize) -> Self {
        Self {
            probe,
            window: SampleWindow::new(capacity),
            formatter: DisplayFormatter::new(),
            state: SchedulerState::Idle,
            period: Duration::from_secs(2),
            last_tick: None,
            display: DisplayState::default(),
            ticks: 0,
        }
    }

    /// Starts periodic sampling. The first sample is taken right away so
    /// the display leaves its placeholder state immediately. Starting an
    /// already running scheduler only changes its period.
    pub fn start(&mut self, period: Duration, config: &DisplayConfig) {
        if self.state == SchedulerState::Running {
            self.set_period(period);
            return;
        }
        self.period = period.max(MIN_PERIOD);
        self.state = SchedulerState::Running;
        info!(period = ?self.period, capacity = self.window.capacity(), "sampling started");
        self.run_tick(Instant::now(), config);
    }

    /// Stops sampling. Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Idle {
            debug!("stop requested while idle");
            return;
        }
        self.state = SchedulerState::Idle;
        info!(ticks = self.ticks, "sampling stopped");
    }

    /// Re-arms the periodic source with a new period, counted from the last
    /// tick. Does not sample.
    pub fn set_period(&mut self, period: Duration) {
        let period = period.max(MIN_PERIOD);
        if period != self.period {
            info!(from = ?self.period, to = ?period, "sampling period changed");
            self.period = period;
        }
    }

    /// Runs a tick when one is due. Returns whether it did.
    pub fn poll(&mut self, now: Instant, config: &DisplayConfig) -> bool {
        if self.state != SchedulerState::Running {
            return false;
        }
        if self.next_due().is_some_and(|due| now < due) {
            return false;
        }
        self.run_tick(now, config);
        true
    }

    fn run_tick(&mut self, now: Instant, config: &DisplayConfig) {
        self.last_tick = Some(now);
        if self.tick(config).is_break() {
            self.stop();
        }
    }

    /// Samples once, records the reading, and refreshes the display state.
    pub fn tick(&mut self, config: &DisplayConfig) -> ControlFlow<()> {
        let reading = self.probe.sample();
        trace!(vendor = %reading.vendor, load = ?reading.gpu_load,
            temp = ?reading.temperature, mem = ?reading.memory_used, "sample");
        self.window.push(reading);
        self.ticks += 1;
        self.refresh(config);
        ControlFlow::Continue(())
    }

    /// Re-formats the latest reading, e.g. after a settings change.
    pub fn refresh(&mut self, config: &DisplayConfig) {
        if let Some(latest) = self.window.latest() {
            self.display.label = self.formatter.format_label(latest, config);
            self.display.tooltip = self.formatter.format_tooltip(latest);
        }
        if config.show_chart {
            self.display.charts_dirty = true;
        }
    }

    /// When the next tick is due, if running.
    pub fn next_due(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::Running => self.last_tick.map(|t| t + self.period),
            SchedulerState::Idle => None,
        }
    }

    /// Clears and returns the chart repaint flag.
    pub fn take_chart_redraw(&mut self) -> bool {
        std::mem::take(&mut self.display.charts_dirty)
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.window.latest()
    }

    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
