use ratatui::style::Color;

use crate::model::notification::NotificationKind;

pub const FOCUS: Color = Color::Cyan;
pub const UNFOCUSED: Color = Color::DarkGray;
pub const RUNNING: Color = Color::Green;

pub fn kind_color(kind: NotificationKind) -> Color {
    match kind {
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
        NotificationKind::Warning => Color::Yellow,
        NotificationKind::Info => Color::Blue,
    }
}

/// Jira priority ids run 1 (highest) to 5 (lowest).
pub fn priority_color(rank: u8) -> Color {
    match rank {
        1 => Color::Red,
        2 => Color::Rgb(0xFF, 0x70, 0x43),
        3 => Color::Yellow,
        4 => Color::Blue,
        _ => Color::Gray,
    }
}

pub fn border(focused: bool) -> Color {
    if focused {
        FOCUS
    } else {
        UNFOCUSED
    }
}
