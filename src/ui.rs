use chrono::{TimeDelta, Utc};
use gpu_sparkline::render::terminal::{DOTS_X, DOTS_Y};
use gpu_sparkline::render::{DetailLayout, SurfaceWidget};
use gpu_sparkline::theme::*;
use gpu_sparkline::{Channel, ChartRenderer, ChartSeries, DetailChart, Probe};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, Paragraph, Widget},
    Frame,
};

use crate::app::App;

const GAUGE_BG: Color = Color::Rgb(20, 20, 30);

/// Last painted sparkline strip. It is repainted only after the scheduler
/// flags the charts or when the strip moves.
#[derive(Debug, Default)]
pub struct PanelCache {
    buffer: Option<Buffer>,
    stale: bool,
    paints: u64,
}

impl PanelCache {
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Returns the cached strip for `area`, calling `draw` first if it is
    /// stale.
    pub fn paint(&mut self, area: Rect, draw: impl FnOnce(&mut Buffer)) -> &Buffer {
        let fresh = !self.stale && self.buffer.as_ref().is_some_and(|b| b.area == area);
        if !fresh {
            let mut buffer = Buffer::empty(area);
            buffer.set_style(area, Style::default().bg(DARK_BG));
            draw(&mut buffer);
            self.buffer = Some(buffer);
            self.stale = false;
            self.paints += 1;
        }
        self.buffer.get_or_insert_with(|| Buffer::empty(area))
    }

    #[cfg(test)]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    #[cfg(test)]
    pub fn paints(&self) -> u64 {
        self.paints
    }
}

/// Renders header, panel strip, history chart, details and key help.
pub fn render<P: Probe>(frame: &mut Frame, app: &mut App<P>) {
    // Main container with dark background
    let main_block = Block::default().style(Style::default().bg(DARK_BG));
    frame.render_widget(main_block, frame.area());

    let panel_rows = if app.config.show_chart {
        app.config.chart_height / DOTS_Y
    } else {
        1
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),              // Header
            Constraint::Length(panel_rows + 2), // Panel strip
            Constraint::Min(8),                 // History + details
            Constraint::Length(1),              // Keys
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);
    render_panel(frame, chunks[1], app);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(32)])
        .split(chunks[2]);
    render_history(frame, body[0], app);
    render_details(frame, body[1], app);

    render_keys(frame, chunks[3]);
}

fn render_header<P: Probe>(frame: &mut Frame, area: Rect, app: &App<P>) {
    let now = Utc::now();
    let window = app.scheduler.window();
    let span = window
        .oldest()
        .map(|r| now - r.timestamp)
        .unwrap_or(TimeDelta::zero());
    let vendor = app
        .scheduler
        .latest()
        .map(|r| r.vendor.to_string())
        .unwrap_or_else(|| "--".to_string());

    let glitch_char = if app.frame_count % 10 < 2 { "█" } else { " " };
    let (state, state_color) = if app.scheduler.is_running() {
        ("LIVE", NEON_GREEN)
    } else {
        ("PAUSED", NEON_YELLOW)
    };
    let sep = || Span::styled(" │ ", Style::default().fg(NEON_GREEN));

    let line = Line::from(vec![
        Span::styled(glitch_char, Style::default().fg(NEON_MAGENTA)),
        Span::styled(
            " GPU SPARKLINE ",
            Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            concat!("v", env!("CARGO_PKG_VERSION")),
            Style::default().fg(CYBER_BLUE),
        ),
        sep(),
        Span::styled(
            now.format("%H:%M:%S").to_string(),
            Style::default().fg(NEON_YELLOW),
        ),
        sep(),
        Span::styled(vendor, Style::default().fg(NEON_MAGENTA)),
        sep(),
        Span::styled(
            format!(
                "WINDOW: {:02}:{:02} ({}/{})",
                span.num_minutes(),
                span.num_seconds() % 60,
                window.len(),
                window.capacity()
            ),
            Style::default().fg(NEON_CYAN),
        ),
        sep(),
        Span::styled(
            format!("EVERY {}s", app.config.update_interval),
            Style::default().fg(CYBER_BLUE),
        ),
        sep(),
        Span::styled(
            state,
            Style::default().fg(state_color).add_modifier(Modifier::BOLD),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(NEON_GREEN))
        .style(Style::default().bg(DARK_BG));
    let header = Paragraph::new(line)
        .block(block)
        .alignment(Alignment::Left);
    frame.render_widget(header, area);
}

/// The panel applet stand-in: either the text label or one sparkline per
/// enabled channel.
fn render_panel<P: Probe>(frame: &mut Frame, area: Rect, app: &mut App<P>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(MATRIX_GREEN))
        .title(Span::styled(" ◆ PANEL ", Style::default().fg(NEON_GREEN)))
        .style(Style::default().bg(DARK_BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let config = &app.config;
    if !config.show_chart {
        frame.render_widget(Paragraph::new(label_line(app)), inner);
        return;
    }

    let channels: Vec<Channel> = config.enabled_channels().collect();
    if channels.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "no channels enabled",
            Style::default().fg(Color::DarkGray),
        ));
        frame.render_widget(empty, inner);
        return;
    }

    let width = config.chart_width / DOTS_X;
    let mut constraints = vec![Constraint::Length(width); channels.len()];
    constraints.push(Constraint::Min(0));
    let cells = Layout::default()
        .direction(Direction::Horizontal)
        .spacing(1)
        .constraints(constraints)
        .split(inner);

    let window = app.scheduler.window();
    let renderer = ChartRenderer::new();
    let strip = app.panel.paint(inner, |buf| {
        for (channel, cell) in channels.into_iter().zip(cells.iter()) {
            SurfaceWidget::new(DARK_BG_RGB, |surface| {
                renderer.draw(surface, &ChartSeries::new(window, channel), config)
            })
            .render(*cell, buf);
        }
    });
    frame.buffer_mut().merge(strip);
}

/// The formatted label with each field in its channel color.
fn label_line<P: Probe>(app: &App<P>) -> Line<'_> {
    let label = app.scheduler.display().label.as_str();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let shown: Vec<Channel> = match app.scheduler.latest() {
        Some(latest) => app
            .config
            .enabled_channels()
            .filter(|c| latest.value(*c).is_some())
            .collect(),
        None => Vec::new(),
    };
    let parts: Vec<&str> = label.split(" | ").collect();
    if shown.len() != parts.len() {
        return Line::from(Span::styled(label, bold.fg(Color::DarkGray)));
    }

    let mut spans = Vec::new();
    for (i, (part, channel)) in parts.into_iter().zip(shown).enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", Style::default().fg(MATRIX_GREEN)));
        }
        spans.push(Span::styled(part, bold.fg(channel_color(channel))));
    }
    Line::from(spans)
}

fn render_history<P: Probe>(frame: &mut Frame, area: Rect, app: &App<P>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(40, 80, 40)))
        .title(Span::styled(" ◇ HISTORY ", Style::default().fg(NEON_GREEN)))
        .style(Style::default().bg(DARK_BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chart = DetailChart::new(DetailLayout::compact());
    let window = app.scheduler.window();
    let widget = SurfaceWidget::new(DARK_BG_RGB, |surface| {
        chart.draw(surface, window, &app.config)
    });
    frame.render_widget(widget, inner);
}

/// Tooltip text, one gauge per channel, and host status.
fn render_details<P: Probe>(frame: &mut Frame, area: Rect, app: &App<P>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(MATRIX_GREEN))
        .title(Span::styled(" ◇ DETAILS ", Style::default().fg(CYBER_BLUE)))
        .style(Style::default().bg(DARK_BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let tooltip = &app.scheduler.display().tooltip;
    let tooltip_rows = tooltip.lines().count() as u16;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(tooltip_rows + 1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let lines: Vec<Line> = tooltip
        .lines()
        .enumerate()
        .map(|(i, text)| {
            let style = if i == 0 {
                Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(text, style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), rows[0]);

    let latest = app.scheduler.latest();
    for (i, channel) in Channel::ALL.into_iter().enumerate() {
        let value = latest.and_then(|r| r.value(channel));
        frame.render_widget(channel_gauge(channel, value), rows[i + 1]);
    }

    let config = &app.config;
    let on_off = |on: bool| if on { "on" } else { "off" };
    let mut status = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("MODE ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                if config.show_chart { "chart" } else { "text" },
                Style::default().fg(NEON_CYAN),
            ),
            Span::styled("  FILL ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{}%", config.chart_transparency),
                Style::default().fg(NEON_CYAN),
            ),
            Span::styled("  LOG ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                on_off(config.enable_logging),
                Style::default().fg(NEON_CYAN),
            ),
        ]),
    ];
    if let Some(message) = &app.status {
        status.push(Line::from(Span::styled(
            format!("> {message}"),
            Style::default().fg(NEON_YELLOW),
        )));
    }
    frame.render_widget(Paragraph::new(status), rows[4]);
}

fn channel_gauge(channel: Channel, value: Option<i32>) -> Gauge<'static> {
    let name = match channel {
        Channel::GpuLoad => "GPU",
        Channel::Temperature => "TMP",
        Channel::Memory => "MEM",
    };
    let (color, label) = match value {
        Some(v) => {
            let color = match channel {
                Channel::Temperature => temperature_color(v),
                _ => load_color(v),
            };
            (color, format!("▓ {name} {v:>3}{}", channel.unit()))
        }
        None => (Color::DarkGray, format!("▓ {name}  --")),
    };
    Gauge::default()
        .gauge_style(Style::default().fg(color).bg(GAUGE_BG))
        .percent(value.unwrap_or(0).clamp(0, 100) as u16)
        .label(Span::styled(
            label,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_keys(frame: &mut Frame, area: Rect) {
    let keys = [
        ("q", "quit"),
        ("c", "chart/text"),
        ("g t m", "channels"),
        ("+ -", "interval"),
        ("[ ]", "fill"),
        ("l", "log"),
        ("p", "pause"),
        ("s", "save"),
    ];
    let mut spans = Vec::new();
    for (i, (key, action)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(MATRIX_GREEN)));
        }
        spans.push(Span::styled(
            *key,
            Style::default().fg(NEON_YELLOW).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(" {action}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(DARK_BG)),
        area,
    );
}
