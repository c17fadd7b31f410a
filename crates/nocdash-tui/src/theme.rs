//! Color palette and semantic styling for the NOC dashboard.
//!
//! Severity colors follow the Zabbix convention operators already know:
//! red for disaster, orange for high, yellow for warnings, blue for
//! informational noise.

use ratatui::style::{Color, Modifier, Style};

use nocdash_core::{InstanceStatus, Severity};

// ── Core palette ──────────────────────────────────────────────────────

pub const DISASTER_RED: Color = Color::Rgb(229, 69, 57); // #e54539
pub const HIGH_ORANGE: Color = Color::Rgb(233, 118, 57); // #e97639
pub const AVERAGE_AMBER: Color = Color::Rgb(255, 160, 89); // #ffa059
pub const WARNING_YELLOW: Color = Color::Rgb(255, 200, 89); // #ffc859
pub const INFO_BLUE: Color = Color::Rgb(117, 153, 255); // #7599ff
pub const OK_GREEN: Color = Color::Rgb(89, 219, 143); // #59db8f

// ── Extended palette ──────────────────────────────────────────────────

pub const FG_TEXT: Color = Color::Rgb(205, 209, 220); // #cdd1dc
pub const FG_DIM: Color = Color::Rgb(130, 140, 160); // #828ca0
pub const BORDER_GRAY: Color = Color::Rgb(84, 96, 120); // #546078
pub const BG_HIGHLIGHT: Color = Color::Rgb(42, 46, 58); // #2a2e3a
pub const BG_DARK: Color = Color::Rgb(24, 26, 33); // #181a21
pub const ACCENT_CYAN: Color = Color::Rgb(102, 217, 232); // #66d9e8

// ── Domain colors ─────────────────────────────────────────────────────

/// Severity color used for alarm rows, badges, and counts.
pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Disaster => DISASTER_RED,
        Severity::High => HIGH_ORANGE,
        Severity::Average => AVERAGE_AMBER,
        Severity::Warning => WARNING_YELLOW,
        Severity::Information => INFO_BLUE,
        Severity::NotClassified => FG_DIM,
    }
}

/// Instance connection status color.
pub fn status_color(status: InstanceStatus) -> Color {
    match status {
        InstanceStatus::Connected => OK_GREEN,
        InstanceStatus::Error => DISASTER_RED,
        InstanceStatus::Disconnected => WARNING_YELLOW,
    }
}

// ── Semantic styles ───────────────────────────────────────────────────

/// Title text for blocks/panels.
pub fn title_style() -> Style {
    Style::default().fg(ACCENT_CYAN).add_modifier(Modifier::BOLD)
}

/// Border for a focused panel.
pub fn border_focused() -> Style {
    Style::default().fg(ACCENT_CYAN)
}

/// Border for an unfocused panel.
pub fn border_default() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Table header row.
pub fn table_header() -> Style {
    Style::default()
        .fg(ACCENT_CYAN)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

/// Normal table row text.
pub fn table_row() -> Style {
    Style::default().fg(FG_TEXT)
}

/// Selected / highlighted table row.
pub fn table_selected() -> Style {
    Style::default()
        .fg(ACCENT_CYAN)
        .bg(BG_HIGHLIGHT)
        .add_modifier(Modifier::BOLD)
}

/// Active tab in the tab bar.
pub fn tab_active() -> Style {
    Style::default().fg(ACCENT_CYAN).add_modifier(Modifier::BOLD)
}

/// Inactive tab in the tab bar.
pub fn tab_inactive() -> Style {
    Style::default().fg(FG_DIM)
}

/// Key hint text (e.g., "q quit  ? help").
pub fn key_hint() -> Style {
    Style::default().fg(BORDER_GRAY)
}

/// Key hint key character.
pub fn key_hint_key() -> Style {
    Style::default().fg(ACCENT_CYAN).add_modifier(Modifier::BOLD)
}
