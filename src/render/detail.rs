use crate::config::DisplayConfig;
use crate::window::SampleWindow;

use super::{alpha, centered_text, fill_and_stroke, FontWeight, PlotArea, Rgba, Surface};

const BACKGROUND: Rgba = Rgba::gray(0.1);
const GRID: Rgba = Rgba::gray(0.3);
const AXIS_TEXT: Rgba = Rgba::gray(0.8);
const MESSAGE_FONT_SIZE: f64 = 16.0;
const AXIS_FONT_SIZE: f64 = 10.0;
const LINE_WIDTH: f64 = 2.0;
const VERTICAL_LINES: usize = 10;
const HORIZONTAL_LINES: usize = 5;

/// Margins and legend geometry of the detail chart, in surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetailLayout {
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    pub margin_bottom: f64,
    pub axis_label_x: f64,
    pub legend_row: f64,
    pub swatch_width: f64,
}

impl Default for DetailLayout {
    fn default() -> Self {
        Self {
            margin_left: 60.0,
            margin_right: 20.0,
            margin_top: 20.0,
            margin_bottom: 40.0,
            axis_label_x: 5.0,
            legend_row: 20.0,
            swatch_width: 15.0,
        }
    }
}

impl DetailLayout {
    /// Tight margins for coarse surfaces such as a terminal raster.
    pub fn compact() -> Self {
        Self {
            margin_left: 10.0,
            margin_right: 2.0,
            margin_top: 4.0,
            margin_bottom: 4.0,
            axis_label_x: 0.0,
            legend_row: 4.0,
            swatch_width: 4.0,
        }
    }
}

/// Large overlay chart of every enabled channel with a grid, a 0..100 axis
/// and a legend.
#[derive(Clone, Copy, Debug, Default)]
pub struct DetailChart {
    layout: DetailLayout,
}

impl DetailChart {
    pub fn new(layout: DetailLayout) -> Self {
        Self { layout }
    }

    pub fn draw(&self, surface: &mut dyn Surface, window: &SampleWindow, config: &DisplayConfig) {
        let (width, height) = surface.size();
        surface.clear();
        surface.set_source(BACKGROUND);
        surface.fill_rect(0.0, 0.0, width, height);

        if window.len() < 2 {
            centered_text(surface, "Collecting data...", Rgba::WHITE, MESSAGE_FONT_SIZE);
            return;
        }

        let channels: Vec<_> = config.enabled_channels().collect();
        if channels.is_empty() {
            centered_text(surface, "No charts enabled", Rgba::WHITE, MESSAGE_FONT_SIZE);
            return;
        }

        let l = &self.layout;
        let area = PlotArea {
            left: l.margin_left,
            top: l.margin_top,
            width: width - l.margin_left - l.margin_right,
            height: height - l.margin_top - l.margin_bottom,
        };

        self.draw_grid(surface, &area);

        for channel in &channels {
            let values = window.channel(*channel);
            let points = area.points(&values);
            if points.len() < 2 {
                continue;
            }
            fill_and_stroke(
                surface,
                &area,
                &points,
                channel.color(),
                alpha(config.chart_transparency),
                LINE_WIDTH,
            );
        }

        let legend_top = area.top + l.legend_row / 2.0;
        for (i, channel) in channels.iter().enumerate() {
            let y = legend_top + i as f64 * l.legend_row;
            surface.set_source(channel.color());
            surface.fill_rect(area.left + 10.0, y, l.swatch_width, 3.0);
            surface.set_source(Rgba::WHITE);
            surface.show_text(
                area.left + 15.0 + l.swatch_width,
                y + l.legend_row / 2.0,
                channel.long_name(),
            );
        }
    }

    fn draw_grid(&self, surface: &mut dyn Surface, area: &PlotArea) {
        surface.set_source(GRID);
        for i in 0..=VERTICAL_LINES {
            let x = area.left + area.width * i as f64 / VERTICAL_LINES as f64;
            surface.move_to(x, area.top);
            surface.line_to(x, area.bottom());
            surface.stroke(1.0);
        }
        for i in 0..=HORIZONTAL_LINES {
            let y = area.top + area.height * i as f64 / HORIZONTAL_LINES as f64;
            surface.move_to(area.left, y);
            surface.line_to(area.right(), y);
            surface.stroke(1.0);
        }

        surface.set_source(AXIS_TEXT);
        surface.set_font(AXIS_FONT_SIZE, FontWeight::Normal);
        for i in 0..=HORIZONTAL_LINES {
            let value = 100 - i * (100 / HORIZONTAL_LINES);
            let y = area.top + area.height * i as f64 / HORIZONTAL_LINES as f64;
            surface.show_text(self.layout.axis_label_x, y + 4.0, &value.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Channel, Reading, Vendor};
    use crate::render::{DrawOp, RecordingSurface};

    fn window_with(samples: usize) -> SampleWindow {
        let mut window = SampleWindow::default();
        for i in 0..samples {
            let mut reading = Reading::new(Vendor::Nvidia);
            reading.gpu_load = Some(10 * i as i32);
            reading.temperature = Some(50);
            window.push(reading);
        }
        window
    }

    fn draw(window: &SampleWindow, config: &DisplayConfig) -> RecordingSurface {
        let mut surface = RecordingSurface::new(600.0, 400.0);
        DetailChart::default().draw(&mut surface, window, config);
        surface
    }

    #[test]
    fn waits_for_two_samples() {
        let surface = draw(&window_with(1), &DisplayConfig::default());
        assert_eq!(surface.texts(), vec!["Collecting data..."]);
    }

    #[test]
    fn says_when_nothing_is_enabled() {
        let config = DisplayConfig {
            show_gpu_load: false,
            show_temperature: false,
            show_memory: false,
            ..DisplayConfig::default()
        };
        let surface = draw(&window_with(3), &config);
        assert_eq!(surface.texts(), vec!["No charts enabled"]);
    }

    #[test]
    fn draws_axis_labels_and_legend_for_enabled_channels() {
        let surface = draw(&window_with(3), &DisplayConfig::default());
        assert_eq!(
            surface.texts(),
            vec![
                "100",
                "80",
                "60",
                "40",
                "20",
                "0",
                Channel::GpuLoad.long_name(),
                Channel::Temperature.long_name(),
                Channel::Memory.long_name(),
            ]
        );
    }

    #[test]
    fn skips_series_without_two_present_points() {
        let surface = draw(&window_with(3), &DisplayConfig::default());
        let fills = surface.ops().iter().filter(|op| **op == DrawOp::Fill).count();
        // Load and temperature have data, memory has none.
        assert_eq!(fills, 2);
        let series_strokes = surface
            .ops()
            .iter()
            .filter(|op| **op == DrawOp::Stroke { line_width: 2.0 })
            .count();
        assert_eq!(series_strokes, 2);
    }
}
