//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin surface:
//! - Event loop (keyboard, resize)
//! - An embedded [`Conductor`] owning the bound conversation
//! - One [`TypewriterPlayer`] animating the streaming row
//!
//! The App:
//! 1. Converts terminal events to [`SurfaceEvent`]s
//! 2. Applies backend completions as they finish
//! 3. Re-projects the latest snapshot into a [`RenderView`]
//! 4. Renders the view, revealing the streaming row through the player

use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use tokio::time::MissedTickBehavior;

use twinchat_core::{
    project, ClientConfig, Conductor, ConductorConfig, ConversationBackend,
    ConversationId, ConversationSnapshot, RenderView, RowBody, SendOutcome, SurfaceEvent,
    TypewriterConfig, TypewriterPlayer,
};

use crate::display::{self, CURSOR};
use crate::theme;

/// Input box height (lines), including the separator
const INPUT_HEIGHT: u16 = 4;

/// Redraw interval when nothing else happens (keeps timestamps and resizes fresh)
const FRAME_INTERVAL: Duration = Duration::from_millis(250);

/// Main application state
pub struct App {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Conductor Integration ===
    /// Owns the bound conversation
    conductor: Conductor<dyn ConversationBackend>,
    /// Latest snapshot published by the Conductor
    snapshot: ConversationSnapshot,
    /// Projection of `snapshot`
    view: RenderView,
    /// Reveals the streaming row
    player: TypewriterPlayer,

    // === Navigation ===
    /// Conversations reachable with Tab
    conversations: Vec<ConversationId>,
    /// Index of the bound conversation
    current: usize,

    // === Input State ===
    /// User input buffer
    input_buffer: String,
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered lines (for scroll bounds)
    total_lines: usize,
    /// Height of the conversation area at the last render
    conversation_height: usize,
}

impl App {
    /// Create a new App; nothing is bound until [`start`](Self::start)
    pub fn new(
        backend: Arc<dyn ConversationBackend>,
        config: &ClientConfig,
        conversations: Vec<ConversationId>,
    ) -> Self {
        let conductor = Conductor::new(backend, ConductorConfig::from(config));
        let player = TypewriterPlayer::new(TypewriterConfig {
            rate: config.typewriter_rate,
        });

        Self {
            running: true,
            conductor,
            snapshot: ConversationSnapshot::default(),
            view: RenderView::default(),
            player,
            conversations,
            current: 0,
            input_buffer: String::new(),
            scroll_offset: 0,
            total_lines: 0,
            conversation_height: 0,
        }
    }

    /// Bind the first conversation
    pub fn start(&mut self) {
        self.bind_current();
    }

    /// Is the app still running?
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current input buffer
    pub fn input(&self) -> &str {
        &self.input_buffer
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> &ConversationSnapshot {
        &self.snapshot
    }

    /// Current projection
    pub fn view(&self) -> &RenderView {
        &self.view
    }

    /// The typewriter
    pub fn player(&self) -> &TypewriterPlayer {
        &self.player
    }

    /// Main event loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        let mut event_stream = EventStream::new();

        // Frame tick for idle redraws
        let mut frame_tick = tokio::time::interval(FRAME_INTERVAL);
        frame_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.refresh();
        self.render(terminal)?;

        while self.running {
            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        self.handle_key(key);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                    None => self.running = false,
                },

                // Backend results for the bound conversation
                () = self.conductor.next_completion() => self.refresh(),

                // Typewriter progress
                frame = self.player.advance() => {
                    tracing::trace!(?frame, "Typewriter frame");
                }

                _ = frame_tick.tick() => {}
            }

            self.render(terminal)?;
        }

        self.player.cancel();
        self.conductor.handle_event(SurfaceEvent::Unbind);
        Ok(())
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            // Quit
            KeyCode::Esc => self.running = false,
            KeyCode::Char('c') if ctrl => self.running = false,

            // Conversation actions
            KeyCode::Char('d') if ctrl => self.conductor.handle_event(SurfaceEvent::DismissError),
            KeyCode::Char('r') if ctrl => self.conductor.handle_event(SurfaceEvent::Reload),
            KeyCode::Tab => self.switch_conversation(),

            // Submit message
            KeyCode::Enter => self.submit(),

            // Typing
            KeyCode::Char(c) if !ctrl => self.input_buffer.push(c),
            KeyCode::Backspace => {
                self.input_buffer.pop();
            }

            // Conversation scrolling
            KeyCode::PageUp => {
                let page = (self.conversation_height / 2).max(1);
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + page).min(max_scroll);
            }
            KeyCode::PageDown => {
                let page = (self.conversation_height / 2).max(1);
                self.scroll_offset = self.scroll_offset.saturating_sub(page);
            }

            _ => {}
        }

        self.refresh();
    }

    /// Wait for one backend result and apply it
    pub async fn next_completion(&mut self) {
        self.conductor.next_completion().await;
        self.refresh();
    }

    /// Apply backend results until the bound conversation is idle
    pub async fn settle(&mut self) {
        self.conductor.settle().await;
        self.refresh();
    }

    /// Pull the latest snapshot, re-project it and point the player at the streaming row
    pub fn refresh(&mut self) {
        self.snapshot = self.conductor.snapshot();
        self.view = project(&self.snapshot);

        match self.view.streaming_row().map(|row| &row.body) {
            Some(RowBody::Typewriter { id, content }) => {
                self.player.sync(id, content);
            }
            _ => {
                if self.player.session().is_some() {
                    self.player.cancel();
                }
            }
        }
    }

    fn submit(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        match self.conductor.send(&text) {
            SendOutcome::Accepted => self.scroll_offset = 0,
            outcome => {
                tracing::debug!(?outcome, "Input kept");
                self.input_buffer = text;
            }
        }
    }

    fn switch_conversation(&mut self) {
        if self.conversations.len() < 2 {
            return;
        }
        self.current = (self.current + 1) % self.conversations.len();
        self.bind_current();
    }

    fn bind_current(&mut self) {
        let Some(conversation_id) = self.conversations.get(self.current).cloned() else {
            return;
        };
        tracing::info!(conversation_id = %conversation_id, "Binding conversation");

        self.player.cancel();
        self.scroll_offset = 0;
        self.conductor.handle_event(SurfaceEvent::Bind {
            conversation_id,
            agent_id: None,
        });
        self.refresh();
    }

    /// Draw the current state
    pub fn render<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> anyhow::Result<()> {
        terminal.draw(|frame| self.draw(frame))?;
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let banner = display::banner_text(&self.view);
        let banner_height = u16::from(banner.is_some());
        let [banner_area, conversation_area, input_area, status_area] = Layout::vertical([
            Constraint::Length(banner_height),
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        if let Some(text) = banner {
            frame.render_widget(
                Paragraph::new(text).style(theme::banner_style()),
                banner_area,
            );
        }

        // Conversation, bottom-anchored
        let height = usize::from(conversation_area.height);
        let lines =
            display::conversation_lines(&self.view, &self.player, usize::from(conversation_area.width));
        self.total_lines = lines.len();
        self.conversation_height = height;

        let max_scroll = self.total_lines.saturating_sub(height);
        self.scroll_offset = self.scroll_offset.min(max_scroll);
        let visible_end = self.total_lines - self.scroll_offset;
        let visible_start = visible_end.saturating_sub(height);

        let visible: Vec<Line> = lines[visible_start..visible_end]
            .iter()
            .map(|line| Line::styled(line.text.clone(), line.style))
            .collect();
        frame.render_widget(Paragraph::new(visible), conversation_area);

        // Input
        let input = Paragraph::new(format!("> {}{CURSOR}", self.input_buffer))
            .style(theme::sender_style(twinchat_core::Sender::User))
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(theme::chrome_style()),
            );
        frame.render_widget(input, input_area);

        // Status
        let status = display::status_text(&self.snapshot, self.conversations.len() > 1);
        frame.render_widget(
            Paragraph::new(status).style(theme::chrome_style()),
            status_area,
        );
    }
}
