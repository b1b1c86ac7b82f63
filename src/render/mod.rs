//! Drawing boundary and the chart renderers built on it.
//!
//! Renderers only talk to a [`Surface`], a small immediate-mode 2D API in
//! the style of cairo: set a source color, build a path, then fill or
//! stroke it. Coordinates are in surface pixels with the origin top-left.

pub mod detail;
pub mod recording;
pub mod sparkline;
pub mod terminal;

pub use detail::{DetailChart, DetailLayout};
pub use recording::{DrawOp, RecordingSurface};
pub use sparkline::{ChartRenderer, ChartSeries};
pub use terminal::{SurfaceWidget, TerminalSurface};

/// Straight (non-premultiplied) color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Rgba = Rgba::rgb(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub const fn gray(level: f64) -> Self {
        Self::rgb(level, level, level)
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Source-over compositing of `self` onto an opaque-or-not `dst`.
    pub fn over(self, dst: Rgba) -> Rgba {
        let a = self.a + dst.a * (1.0 - self.a);
        if a <= f64::EPSILON {
            return Rgba::TRANSPARENT;
        }
        let mix = |s: f64, d: f64| (s * self.a + d * dst.a * (1.0 - self.a)) / a;
        Rgba::new(mix(self.r, dst.r), mix(self.g, dst.g), mix(self.b, dst.b), a)
    }

    /// 8-bit channels after flattening onto an opaque backdrop.
    pub fn to_rgb8(self, backdrop: (u8, u8, u8)) -> (u8, u8, u8) {
        let blend = |c: f64, bg: u8| {
            let bg = f64::from(bg) / 255.0;
            ((c * self.a + bg * (1.0 - self.a)) * 255.0).round().clamp(0.0, 255.0) as u8
        };
        (
            blend(self.r, backdrop.0),
            blend(self.g, backdrop.1),
            blend(self.b, backdrop.2),
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// Size of a laid-out string in surface pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtents {
    pub width: f64,
    pub height: f64,
}

/// 2D immediate-mode drawing capability.
///
/// `fill` and `stroke` consume the current path. `show_text` places the
/// baseline of the text at `y`.
pub trait Surface {
    fn size(&self) -> (f64, f64);
    fn clear(&mut self);
    fn set_source(&mut self, color: Rgba);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, line_width: f64);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn close_path(&mut self);
    fn fill(&mut self);
    fn stroke(&mut self, line_width: f64);
    fn set_font(&mut self, size: f64, weight: FontWeight);
    fn text_extents(&self, text: &str) -> TextExtents;
    fn show_text(&mut self, x: f64, y: f64, text: &str);
}

/// Plot area of a chart inside its surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Present samples mapped to pixels. Samples are spaced evenly over the
    /// current series length, not by elapsed time, and values are plotted on
    /// a fixed 0..100 scale without clamping. Needs at least two samples.
    pub fn points(&self, values: &[Option<i32>]) -> Vec<(f64, f64)> {
        let span = values.len().saturating_sub(1).max(1) as f64;
        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| {
                v.map(|v| {
                    let x = self.left + self.width * i as f64 / span;
                    let y = self.top + self.height - self.height * f64::from(v) / 100.0;
                    (x, y)
                })
            })
            .collect()
    }
}

/// Builds an open polyline through `points`; absent samples were already
/// dropped, so gaps are bridged rather than broken.
pub(crate) fn trace(surface: &mut dyn Surface, points: &[(f64, f64)]) {
    let mut iter = points.iter();
    if let Some(&(x, y)) = iter.next() {
        surface.move_to(x, y);
    }
    for &(x, y) in iter {
        surface.line_to(x, y);
    }
}

/// Filled area under the series, then the series line on top.
pub(crate) fn fill_and_stroke(
    surface: &mut dyn Surface,
    area: &PlotArea,
    points: &[(f64, f64)],
    color: Rgba,
    fill_alpha: f64,
    line_width: f64,
) {
    if points.is_empty() {
        return;
    }

    surface.set_source(color.with_alpha(fill_alpha));
    trace(surface, points);
    surface.line_to(area.right(), area.bottom());
    surface.line_to(area.left, area.bottom());
    surface.close_path();
    surface.fill();

    surface.set_source(color);
    trace(surface, points);
    surface.stroke(line_width);
}

/// Draws `text` centered horizontally, baseline slightly below the middle.
pub(crate) fn centered_text(surface: &mut dyn Surface, text: &str, color: Rgba, size: f64) {
    let (width, height) = surface.size();
    surface.set_source(color);
    surface.set_font(size, FontWeight::Normal);
    let extents = surface.text_extents(text);
    surface.show_text((width - extents.width) / 2.0, height / 2.0 + 2.0, text);
}

/// Percent setting (0..100) as an alpha value.
pub(crate) fn alpha(percent: u8) -> f64 {
    f64::from(percent.min(100)) / 100.0
}
