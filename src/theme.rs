use ratatui::style::Color;

use crate::models::Channel;

// Приглушённая хакерская цветовая схема
pub const NEON_GREEN: Color = Color::Rgb(0, 160, 50);
pub const NEON_CYAN: Color = Color::Rgb(0, 150, 160);
pub const NEON_MAGENTA: Color = Color::Rgb(160, 60, 160);
pub const NEON_YELLOW: Color = Color::Rgb(180, 160, 60);
pub const NEON_RED: Color = Color::Rgb(180, 60, 60);
pub const MATRIX_GREEN: Color = Color::Rgb(30, 130, 30);
pub const CYBER_BLUE: Color = Color::Rgb(60, 130, 180);

pub const DARK_BG_RGB: (u8, u8, u8) = (15, 15, 25);
pub const DARK_BG: Color = Color::Rgb(DARK_BG_RGB.0, DARK_BG_RGB.1, DARK_BG_RGB.2);

/// Chart color of a channel flattened onto the terminal background.
pub fn channel_color(channel: Channel) -> Color {
    let (r, g, b) = channel.color().to_rgb8(DARK_BG_RGB);
    Color::Rgb(r, g, b)
}

/// Status color for a load or memory percentage.
pub fn load_color(percent: i32) -> Color {
    if percent > 90 {
        NEON_RED
    } else if percent > 50 {
        NEON_YELLOW
    } else {
        NEON_GREEN
    }
}

pub fn temperature_color(celsius: i32) -> Color {
    if celsius > 80 {
        NEON_RED
    } else if celsius > 60 {
        NEON_YELLOW
    } else {
        NEON_CYAN
    }
}
