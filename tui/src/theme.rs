//! Theme and Colors
//!
//! The chat palette. Kept small: one color per sender, plus the banner and
//! the dimmed chrome.

use ratatui::style::{Color, Modifier, Style};

use twinchat_core::Sender;

/// User messages
pub const USER_GREEN: Color = Color::Green;

/// Agent messages - teal, reads well on dark and light terminals
pub const AGENT_TEAL: Color = Color::Rgb(64, 190, 180);

/// Error banner background
pub const BANNER_RED: Color = Color::Rgb(170, 40, 40);

/// Status bar, separators, hints
pub const CHROME_GRAY: Color = Color::DarkGray;

/// Style for a sender's rows
pub fn sender_style(sender: Sender) -> Style {
    match sender {
        Sender::User => Style::default().fg(USER_GREEN),
        Sender::Agent => Style::default().fg(AGENT_TEAL),
    }
}

/// Style for the error banner
pub fn banner_style() -> Style {
    Style::default()
        .fg(Color::White)
        .bg(BANNER_RED)
        .add_modifier(Modifier::BOLD)
}

/// Style for dimmed chrome
pub fn chrome_style() -> Style {
    Style::default().fg(CHROME_GRAY)
}
