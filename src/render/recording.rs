use super::{FontWeight, Rgba, Surface, TextExtents};

/// One primitive call issued against a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear,
    SetSource(Rgba),
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    StrokeRect { x: f64, y: f64, width: f64, height: f64, line_width: f64 },
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    ClosePath,
    Fill,
    Stroke { line_width: f64 },
    SetFont { size: f64, weight: FontWeight },
    ShowText { x: f64, y: f64, text: String },
}

/// Surface that keeps the ordered list of calls made on it, for hosts that
/// replay draw calls on their own toolkit and for assertions in tests.
///
/// Text is measured with a fixed advance of 0.6 × font size per character.
#[derive(Clone, Debug)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    font_size: f64,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            font_size: 10.0,
            ops: Vec::new(),
        }
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Every string drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::ShowText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of path building or path painting calls.
    pub fn path_ops(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| {
                matches!(
                    op,
                    DrawOp::MoveTo { .. }
                        | DrawOp::LineTo { .. }
                        | DrawOp::ClosePath
                        | DrawOp::Fill
                        | DrawOp::Stroke { .. }
                )
            })
            .count()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.ops.push(DrawOp::Clear);
    }

    fn set_source(&mut self, color: Rgba) {
        self.ops.push(DrawOp::SetSource(color));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(DrawOp::FillRect { x, y, width, height });
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, line_width: f64) {
        self.ops.push(DrawOp::StrokeRect {
            x,
            y,
            width,
            height,
            line_width,
        });
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ops.push(DrawOp::LineTo { x, y });
    }

    fn close_path(&mut self) {
        self.ops.push(DrawOp::ClosePath);
    }

    fn fill(&mut self) {
        self.ops.push(DrawOp::Fill);
    }

    fn stroke(&mut self, line_width: f64) {
        self.ops.push(DrawOp::Stroke { line_width });
    }

    fn set_font(&mut self, size: f64, weight: FontWeight) {
        self.font_size = size;
        self.ops.push(DrawOp::SetFont { size, weight });
    }

    fn text_extents(&self, text: &str) -> TextExtents {
        TextExtents {
            width: text.chars().count() as f64 * self.font_size * 0.6,
            height: self.font_size,
        }
    }

    fn show_text(&mut self, x: f64, y: f64, text: &str) {
        self.ops.push(DrawOp::ShowText {
            x,
            y,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_calls_in_order() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        surface.move_to(1.0, 2.0);
        surface.line_to(3.0, 4.0);
        surface.stroke(1.5);
        surface.show_text(0.0, 5.0, "hi");
        assert_eq!(
            surface.ops(),
            &[
                DrawOp::MoveTo { x: 1.0, y: 2.0 },
                DrawOp::LineTo { x: 3.0, y: 4.0 },
                DrawOp::Stroke { line_width: 1.5 },
                DrawOp::ShowText {
                    x: 0.0,
                    y: 5.0,
                    text: "hi".into()
                },
            ]
        );
        assert_eq!(surface.path_ops(), 3);
        assert_eq!(surface.texts(), vec!["hi"]);
    }

    #[test]
    fn text_extents_follow_font_size() {
        let mut surface = RecordingSurface::new(10.0, 10.0);
        surface.set_font(20.0, FontWeight::Bold);
        let extents = surface.text_extents("abc");
        assert_eq!(extents.height, 20.0);
        assert!((extents.width - 36.0).abs() < 1e-9);
    }
}
