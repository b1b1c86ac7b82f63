use std::collections::HashMap;
use std::io;
use std::time::Duration;

use gpu_sparkline::render::{RecordingSurface, SurfaceWidget};
use gpu_sparkline::{
    Channel, ChartRenderer, ChartSeries, CommandOutput, CommandRunner, DisplayConfig, Scheduler,
    Vendor, VendorProbe,
};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::widgets::Widget;

/// Answers by program name; anything unscripted is "not installed".
#[derive(Default)]
struct ScriptedRunner {
    outputs: HashMap<&'static str, io::Result<CommandOutput>>,
}

impl ScriptedRunner {
    fn with(mut self, program: &'static str, output: CommandOutput) -> Self {
        self.outputs.insert(program, Ok(output));
        self
    }

    fn with_error(mut self, program: &'static str, kind: io::ErrorKind) -> Self {
        self.outputs.insert(program, Err(io::Error::from(kind)));
        self
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[&str], _timeout: Duration) -> io::Result<CommandOutput> {
        match argv.first().and_then(|program| self.outputs.get(program)) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(e)) => Err(io::Error::from(e.kind())),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

fn scheduler(runner: ScriptedRunner) -> Scheduler<VendorProbe<ScriptedRunner>> {
    Scheduler::new(VendorProbe::new(runner), 60)
}

fn chart_texts(window: &gpu_sparkline::SampleWindow, channel: Channel) -> Vec<String> {
    let mut surface = RecordingSurface::new(50.0, 24.0);
    ChartRenderer::new().draw(
        &mut surface,
        &ChartSeries::new(window, channel),
        &DisplayConfig::default(),
    );
    surface.texts().into_iter().map(str::to_string).collect()
}

#[test]
fn nvidia_reading_flows_to_label_tooltip_and_chart() {
    let runner = ScriptedRunner::default().with("nvidia-smi", CommandOutput::ok("45, 67, 2048, 8192\n"));
    let config = DisplayConfig::default();
    let mut s = scheduler(runner);

    s.start(Duration::from_secs(2), &config);
    assert_eq!(s.display().label, "G: 45% | T: 67°C | M: 25%");
    assert_eq!(
        s.display().tooltip,
        "GPU Monitor\nVendor: NVIDIA\nGPU Load: 45%\nTemperature: 67°C\nMemory: 25%"
    );

    // One sample is not a line yet.
    assert_eq!(chart_texts(s.window(), Channel::GpuLoad), vec!["g"]);

    let _ = s.tick(&config);
    assert_eq!(chart_texts(s.window(), Channel::GpuLoad), vec!["g:45%"]);
    assert_eq!(chart_texts(s.window(), Channel::Temperature), vec!["t:67°"]);
    assert_eq!(chart_texts(s.window(), Channel::Memory), vec!["m:25%"]);
}

#[test]
fn amd_is_used_when_nvidia_is_missing() {
    let runner = ScriptedRunner::default().with(
        "radeontop",
        CommandOutput::failed("gpu 72.3% ... 65.0C ... vram 40.1%"),
    );
    let mut s = scheduler(runner);
    s.start(Duration::from_secs(1), &DisplayConfig::default());

    let latest = s.latest().unwrap();
    assert_eq!(latest.vendor, Vendor::Amd);
    assert_eq!(s.display().label, "G: 72% | T: 65°C | M: 40%");
    assert!(s.display().tooltip.contains("Vendor: AMD"));
}

#[test]
fn nothing_installed_degrades_to_placeholders() {
    let config = DisplayConfig::default();
    let mut s = scheduler(ScriptedRunner::default());
    s.start(Duration::from_secs(1), &config);
    let _ = s.tick(&config);

    assert_eq!(s.latest().map(|r| r.vendor), Some(Vendor::Unknown));
    assert_eq!(s.display().label, "GPU: --");
    assert_eq!(s.display().tooltip, "GPU Monitor");
    assert_eq!(chart_texts(s.window(), Channel::GpuLoad), vec!["N/A"]);
}

#[test]
fn internal_failure_reports_error_vendor() {
    let runner =
        ScriptedRunner::default().with_error("nvidia-smi", io::ErrorKind::PermissionDenied);
    let mut s = scheduler(runner);
    s.start(Duration::from_secs(1), &DisplayConfig::default());

    assert_eq!(s.latest().map(|r| r.vendor), Some(Vendor::Error));
    assert_eq!(s.display().label, "GPU: --");
}

#[test]
fn sparkline_paints_into_a_terminal_buffer() {
    let runner = ScriptedRunner::default().with("nvidia-smi", CommandOutput::ok("45, 67, 0, 0\n"));
    let config = DisplayConfig::default();
    let mut s = scheduler(runner);
    s.start(Duration::from_secs(1), &config);
    let _ = s.tick(&config);

    let area = Rect::new(0, 0, 25, 6);
    let mut buf = Buffer::empty(area);
    let window = s.window();
    SurfaceWidget::new((15, 15, 25), |surface| {
        ChartRenderer::new().draw(surface, &ChartSeries::new(window, Channel::GpuLoad), &config)
    })
    .render(area, &mut buf);

    let braille = buf
        .content()
        .iter()
        .filter(|cell| {
            cell.symbol()
                .chars()
                .next()
                .is_some_and(|c| ('\u{2801}'..='\u{28FF}').contains(&c))
        })
        .count();
    assert!(braille > 0);
}

#[test]
fn lossy_radeontop_output_still_samples() {
    let runner = ScriptedRunner::default().with(
        "radeontop",
        CommandOutput::failed("gpu 5.0%, \u{FFFD}61C"),
    );
    let config = DisplayConfig::default();
    let mut s = scheduler(runner);
    s.start(Duration::from_secs(1), &config);
    assert!(s.tick(&config).is_continue());

    assert_eq!(s.latest().map(|r| r.vendor), Some(Vendor::Amd));
    assert_eq!(s.display().label, "G: 5% | T: 61°C");
    assert_eq!(s.ticks(), 2);
}
