use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::braille::{BLANK, DOTS},
    widgets::Widget,
};

use super::{FontWeight, Rgba, Surface, TextExtents};

/// Braille dots per terminal cell.
pub const DOTS_X: u16 = 2;
pub const DOTS_Y: u16 = 4;


/// What last inked a pixel, lowest priority first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
enum Ink {
    #[default]
    None,
    Border,
    Fill,
    Line,
}

#[derive(Clone, Copy, Debug)]
struct Pixel {
    base: Rgba,
    ink: Ink,
    ink_color: Rgba,
}

impl Default for Pixel {
    fn default() -> Self {
        Self {
            base: Rgba::TRANSPARENT,
            ink: Ink::None,
            ink_color: Rgba::TRANSPARENT,
        }
    }
}

#[derive(Clone, Debug)]
struct TextRun {
    col: u16,
    row: u16,
    text: String,
    color: Rgba,
    bold: bool,
}

/// A [`Surface`] backed by a braille-dot raster: every terminal cell holds
/// 2×4 pixels. Rectangle fills set cell backgrounds, path fills and strokes
/// set dots, and text snaps to whole cells.
#[derive(Clone, Debug)]
pub struct TerminalSurface {
    cols: u16,
    rows: u16,
    pixels: Vec<Pixel>,
    source: Rgba,
    subpaths: Vec<Vec<(f64, f64)>>,
    weight: FontWeight,
    texts: Vec<TextRun>,
}

impl TerminalSurface {
    pub fn new(cols: u16, rows: u16) -> Self {
        let len = usize::from(cols * DOTS_X) * usize::from(rows * DOTS_Y);
        Self {
            cols,
            rows,
            pixels: vec![Pixel::default(); len],
            source: Rgba::WHITE,
            subpaths: Vec::new(),
            weight: FontWeight::Normal,
            texts: Vec::new(),
        }
    }

    fn width_px(&self) -> usize {
        usize::from(self.cols * DOTS_X)
    }

    fn height_px(&self) -> usize {
        usize::from(self.rows * DOTS_Y)
    }

    fn pixel_mut(&mut self, x: i64, y: i64) -> Option<&mut Pixel> {
        if x < 0 || y < 0 || x as usize >= self.width_px() || y as usize >= self.height_px() {
            return None;
        }
        let width = self.width_px();
        self.pixels.get_mut(y as usize * width + x as usize)
    }

    fn ink(&mut self, x: i64, y: i64, ink: Ink) {
        let source = self.source;
        if let Some(px) = self.pixel_mut(x, y) {
            px.ink_color = if px.ink == ink {
                source.over(px.ink_color)
            } else {
                source
            };
            px.ink = px.ink.max(ink);
        }
    }

    fn segment(&mut self, from: (f64, f64), to: (f64, f64), ink: Ink) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
        let mut last = None;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let px = (from.0 + dx * t).floor() as i64;
            let py = (from.1 + dy * t).floor() as i64;
            if last != Some((px, py)) {
                self.ink(px, py, ink);
                last = Some((px, py));
            }
        }
    }

    fn current_subpath(&mut self) -> &mut Vec<(f64, f64)> {
        if self.subpaths.is_empty() {
            self.subpaths.push(Vec::new());
        }
        let last = self.subpaths.len() - 1;
        &mut self.subpaths[last]
    }

    /// Copies the raster into `buf` at `area`, flattening translucent
    /// colors onto `backdrop`.
    pub fn paint(&self, area: Rect, buf: &mut Buffer, backdrop: (u8, u8, u8)) {
        let width = self.width_px();
        for row in 0..self.rows.min(area.height) {
            for col in 0..self.cols.min(area.width) {
                let mut bits = 0u16;
                let mut base = [0u32; 3];
                let mut top = Pixel::default();
                for dy in 0..DOTS_Y {
                    for dx in 0..DOTS_X {
                        let x = usize::from(col * DOTS_X + dx);
                        let y = usize::from(row * DOTS_Y + dy);
                        let px = self.pixels[y * width + x];
                        let (r, g, b) = px.base.to_rgb8(backdrop);
                        base[0] += u32::from(r);
                        base[1] += u32::from(g);
                        base[2] += u32::from(b);
                        if px.ink != Ink::None {
                            bits |= DOTS[usize::from(dy)][usize::from(dx)];
                            if px.ink >= top.ink {
                                top = px;
                            }
                        }
                    }
                }
                let n = u32::from(DOTS_X * DOTS_Y);
                let bg = (
                    (base[0] / n) as u8,
                    (base[1] / n) as u8,
                    (base[2] / n) as u8,
                );
                let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) else {
                    continue;
                };
                cell.set_bg(rgb(bg));
                if bits == 0 {
                    cell.set_symbol(" ");
                } else {
                    let glyph = char::from_u32(u32::from(BLANK | bits)).unwrap_or(' ');
                    cell.set_char(glyph);
                    cell.set_fg(rgb(top.ink_color.to_rgb8(bg)));
                }
            }
        }

        for run in &self.texts {
            if run.row >= self.rows.min(area.height) {
                continue;
            }
            for (i, ch) in run.text.chars().enumerate() {
                let col = run.col as usize + i;
                if col >= usize::from(self.cols.min(area.width)) {
                    break;
                }
                let Some(cell) = buf.cell_mut((area.x + col as u16, area.y + run.row)) else {
                    continue;
                };
                let bg = match cell.bg {
                    Color::Rgb(r, g, b) => (r, g, b),
                    _ => backdrop,
                };
                let mut style = Style::default().fg(rgb(run.color.to_rgb8(bg)));
                if run.bold {
                    style = style.add_modifier(Modifier::BOLD);
                }
                cell.set_char(ch).set_style(style);
            }
        }
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

impl Surface for TerminalSurface {
    fn size(&self) -> (f64, f64) {
        (self.width_px() as f64, self.height_px() as f64)
    }

    fn clear(&mut self) {
        self.pixels.fill(Pixel::default());
        self.subpaths.clear();
        self.texts.clear();
    }

    fn set_source(&mut self, color: Rgba) {
        self.source = color;
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let source = self.source;
        let x0 = (x - 0.5).ceil() as i64;
        let x1 = (x + width - 0.5).ceil() as i64;
        let y0 = (y - 0.5).ceil() as i64;
        let y1 = (y + height - 0.5).ceil() as i64;
        for py in y0..y1 {
            for px in x0..x1 {
                if let Some(p) = self.pixel_mut(px, py) {
                    p.base = source.over(p.base);
                }
            }
        }
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64, _line_width: f64) {
        let corners = [
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
        ];
        for i in 0..corners.len() {
            self.segment(corners[i], corners[(i + 1) % corners.len()], Ink::Border);
        }
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.subpaths.push(vec![(x, y)]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.current_subpath().push((x, y));
    }

    fn close_path(&mut self) {
        let first = self.current_subpath().first().copied();
        if let Some(first) = first {
            self.current_subpath().push(first);
            self.subpaths.push(Vec::new());
        }
    }

    /// Even-odd scanline fill sampled at pixel centers; open subpaths are
    /// closed implicitly.
    fn fill(&mut self) {
        let subpaths = std::mem::take(&mut self.subpaths);
        let width = self.width_px() as i64;
        for py in 0..self.height_px() as i64 {
            let yc = py as f64 + 0.5;
            let mut crossings = Vec::new();
            for path in subpaths.iter().filter(|p| p.len() >= 2) {
                for (i, &(x0, y0)) in path.iter().enumerate() {
                    let (x1, y1) = path[(i + 1) % path.len()];
                    if (y0 <= yc && yc < y1) || (y1 <= yc && yc < y0) {
                        crossings.push(x0 + (yc - y0) * (x1 - x0) / (y1 - y0));
                    }
                }
            }
            crossings.sort_by(f64::total_cmp);
            for pair in crossings.chunks_exact(2) {
                let start = ((pair[0] - 0.5).ceil() as i64).max(0);
                let end = ((pair[1] - 0.5).ceil() as i64).min(width);
                for px in start..end {
                    self.ink(px, py, Ink::Fill);
                }
            }
        }
    }

    fn stroke(&mut self, _line_width: f64) {
        let subpaths = std::mem::take(&mut self.subpaths);
        for path in &subpaths {
            if let [only] = path.as_slice() {
                self.segment(*only, *only, Ink::Line);
            }
            for pair in path.windows(2) {
                self.segment(pair[0], pair[1], Ink::Line);
            }
        }
    }

    fn set_font(&mut self, _size: f64, weight: FontWeight) {
        self.weight = weight;
    }

    /// One cell per character, one row tall.
    fn text_extents(&self, text: &str) -> TextExtents {
        TextExtents {
            width: (text.chars().count() as u16 * DOTS_X) as f64,
            height: f64::from(DOTS_Y),
        }
    }

    fn show_text(&mut self, x: f64, y: f64, text: &str) {
        let col = (x / f64::from(DOTS_X)).floor().max(0.0) as u16;
        let row = ((y - f64::from(DOTS_Y)) / f64::from(DOTS_Y)).floor().max(0.0) as u16;
        self.texts.push(TextRun {
            col,
            row,
            text: text.to_string(),
            color: self.source,
            bold: self.weight == FontWeight::Bold,
        });
    }
}

/// Renders whatever the closure draws onto a [`TerminalSurface`] sized to
/// the widget area.
pub struct SurfaceWidget<F> {
    draw: F,
    backdrop: (u8, u8, u8),
}

impl<F: FnOnce(&mut TerminalSurface)> SurfaceWidget<F> {
    pub fn new(backdrop: (u8, u8, u8), draw: F) -> Self {
        Self { draw, backdrop }
    }
}

impl<F: FnOnce(&mut TerminalSurface)> Widget for SurfaceWidget<F> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let mut surface = TerminalSurface::new(area.width, area.height);
        (self.draw)(&mut surface);
        surface.paint(area, buf, self.backdrop);
    }
}
