use crate::config::DisplayConfig;
use crate::models::Channel;
use crate::window::SampleWindow;

use super::{alpha, centered_text, fill_and_stroke, FontWeight, PlotArea, Rgba, Surface};

const MARGIN: f64 = 2.0;
const LINE_WIDTH: f64 = 1.5;
const BORDER_WIDTH: f64 = 1.0;
const PLACEHOLDER_FONT_SIZE: f64 = 10.0;
const VALUE_X: f64 = 3.0;

const BACKGROUND: Rgba = Rgba::gray(0.5);
const BORDER: Rgba = Rgba::gray(0.3);
const GLYPH: Rgba = Rgba::gray(0.6);
const NO_DATA: Rgba = Rgba::gray(0.5);

/// Read-only view of one channel of the window plus how to draw it.
#[derive(Clone, Copy, Debug)]
pub struct ChartSeries<'a> {
    window: &'a SampleWindow,
    channel: Channel,
}

impl<'a> ChartSeries<'a> {
    pub fn new(window: &'a SampleWindow, channel: Channel) -> Self {
        Self { window, channel }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn label(&self) -> &'static str {
        self.channel.short_label()
    }

    pub fn unit(&self) -> &'static str {
        self.channel.unit()
    }

    pub fn color(&self) -> Rgba {
        self.channel.color()
    }

    /// Number of samples in the window, present or not.
    pub fn sample_count(&self) -> usize {
        self.window.len()
    }

    pub fn values(&self) -> Vec<Option<i32>> {
        self.window.channel(self.channel)
    }

    /// Most recent value that is not absent.
    pub fn latest_present(&self) -> Option<i32> {
        self.window
            .snapshot()
            .rev()
            .find_map(|r| r.value(self.channel))
    }
}

/// Draws one channel as a compact filled sparkline with no axes.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChartRenderer;

impl ChartRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Renders the series onto the whole surface. Never fails: an empty or
    /// all-absent series degrades to a placeholder.
    pub fn draw(&self, surface: &mut dyn Surface, series: &ChartSeries<'_>, config: &DisplayConfig) {
        let (width, height) = surface.size();
        paint_background(surface, width, height, config.background_transparency);

        if series.sample_count() < 2 {
            centered_text(surface, series.label(), GLYPH, PLACEHOLDER_FONT_SIZE);
            return;
        }

        let values = series.values();
        if values.iter().all(Option::is_none) {
            centered_text(surface, "N/A", NO_DATA, PLACEHOLDER_FONT_SIZE);
            return;
        }

        let area = PlotArea {
            left: MARGIN,
            top: MARGIN,
            width: width - MARGIN * 2.0,
            height: height - MARGIN * 2.0,
        };
        let points = area.points(&values);
        fill_and_stroke(
            surface,
            &area,
            &points,
            series.color(),
            alpha(config.chart_transparency),
            LINE_WIDTH,
        );

        if let Some(value) = series.latest_present() {
            let text = format!("{}:{}{}", series.label(), value, series.unit());
            surface.set_source(Rgba::WHITE);
            surface.set_font(f64::from(config.chart_font_size), FontWeight::Bold);
            let extents = surface.text_extents(&text);
            surface.show_text(VALUE_X, extents.height + MARGIN, &text);
        }
    }
}

fn paint_background(surface: &mut dyn Surface, width: f64, height: f64, transparency: u8) {
    surface.clear();
    surface.set_source(BACKGROUND.with_alpha(alpha(transparency)));
    surface.fill_rect(0.0, 0.0, width, height);
    surface.set_source(BORDER);
    surface.stroke_rect(0.5, 0.5, width - 1.0, height - 1.0, BORDER_WIDTH);
}
