//! Display Lines
//!
//! Turns a [`RenderView`] into styled, wrapped terminal lines. Verbatim rows
//! print their content; the streaming row prints whatever the typewriter has
//! revealed so far, followed by a cursor.
//!
//! # Design Philosophy
//!
//! The TUI is a thin surface. Everything here is a pure function of the view
//! and the player, so it can be tested without a terminal.

use chrono::Local;
use ratatui::style::Style;

use twinchat_core::{ControllerPhase, ConversationSnapshot, RenderView, Row, RowBody, TypewriterPlayer};

use crate::theme;

/// Cursor drawn after the revealed part of a streaming row
pub const CURSOR: char = '_';

/// One wrapped line of output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayLine {
    /// Text, already wrapped to the target width
    pub text: String,
    /// Style for the whole line
    pub style: Style,
}

impl DisplayLine {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn blank() -> Self {
        Self::new(String::new(), Style::default())
    }
}

/// Text shown for a row right now
pub fn row_text(row: &Row, player: &TypewriterPlayer) -> String {
    match &row.body {
        RowBody::Verbatim(content) => content.clone(),
        RowBody::Typewriter { id, content } => {
            // Before the player has picked the row up nothing is revealed yet
            let revealed = player.visible_text(id, content).unwrap_or_default();
            format!("{revealed}{CURSOR}")
        }
    }
}

/// Wrapped lines for the conversation area
pub fn conversation_lines(
    view: &RenderView,
    player: &TypewriterPlayer,
    width: usize,
) -> Vec<DisplayLine> {
    let width = width.max(1);

    if view.loading_indicator {
        return vec![DisplayLine::new("Loading conversation...", theme::chrome_style())];
    }

    if view.rows.is_empty() {
        return vec![DisplayLine::new(
            "No messages yet. Type below and press Enter.",
            theme::chrome_style(),
        )];
    }

    let mut lines = Vec::new();
    for row in &view.rows {
        let stamp = row.timestamp.with_timezone(&Local).format("%H:%M");
        let content = format!("{} {stamp}: {}", row.sender.label(), row_text(row, player));
        let style = theme::sender_style(row.sender);

        for line in textwrap::wrap(&content, width) {
            lines.push(DisplayLine::new(line.into_owned(), style));
        }
        lines.push(DisplayLine::blank());
    }
    lines
}

/// Banner text, if the view carries an error
pub fn banner_text(view: &RenderView) -> Option<String> {
    view.banner
        .as_ref()
        .map(|banner| format!(" {}: {}  (Ctrl-D to dismiss)", banner.title, banner.detail))
}

/// One-line status bar
pub fn status_text(snapshot: &ConversationSnapshot, switchable: bool) -> String {
    let conversation = snapshot
        .conversation_id
        .as_ref()
        .map_or_else(|| "no conversation".to_string(), ToString::to_string);
    let state = match snapshot.phase {
        ControllerPhase::Idle => "idle",
        ControllerPhase::Loading => "loading",
        ControllerPhase::Ready => "ready",
        ControllerPhase::Sending => "waiting for reply",
    };
    let switch_hint = if switchable { " | Tab switch" } else { "" };
    format!(" {conversation} | {state} | Enter send | Ctrl-R reload{switch_hint} | Esc quit")
}
