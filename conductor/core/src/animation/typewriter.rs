//! Typewriter Reveal
//!
//! Reveals a text payload one character at a time. [`play`] returns a lazy
//! stream of partial snapshots, one per character, spaced `rate` apart and
//! terminated by [`TypewriterFrame::Complete`]. The stream knows nothing about
//! messages; [`TypewriterPlayer`] ties playback to a `(message id, content)`
//! key and restarts from zero whenever that key changes.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::messages::MessageId;

/// Reveal rate used when none is configured (per character)
pub const DEFAULT_RATE: Duration = Duration::from_millis(30);

/// Smallest rate an interval will accept
const MIN_RATE: Duration = Duration::from_millis(1);

/// Typewriter timing configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypewriterConfig {
    /// Delay between two revealed characters
    pub rate: Duration,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self { rate: DEFAULT_RATE }
    }
}

impl TypewriterConfig {
    /// Configuration with a rate in milliseconds per character
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self {
            rate: Duration::from_millis(ms),
        }
    }
}

/// One element of a playback
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypewriterFrame {
    /// A prefix of the content has been revealed
    Partial {
        /// Number of characters revealed so far
        revealed: usize,
        /// The revealed prefix
        text: String,
    },
    /// The whole content has been revealed
    Complete,
}

/// Shared cancellation flag for a playback
///
/// Checked before every emission; once set, the stream ends without
/// producing anything further.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the playback this token was handed to
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Byte offset just past each character of `content`
fn char_boundaries(content: &str) -> Vec<usize> {
    content
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .collect()
}

struct Playback {
    content: String,
    boundaries: Vec<usize>,
    revealed: usize,
    rate: Duration,
    ticker: Option<Interval>,
    cancel: CancelToken,
    finished: bool,
}

impl Playback {
    async fn step(mut self) -> Option<(TypewriterFrame, Self)> {
        if self.finished || self.cancel.is_cancelled() {
            return None;
        }

        if self.revealed == self.boundaries.len() {
            self.finished = true;
            return Some((TypewriterFrame::Complete, self));
        }

        // The first tick lands one period after the first poll
        let rate = self.rate;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval_at(Instant::now() + rate, rate);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        ticker.tick().await;

        if self.cancel.is_cancelled() {
            return None;
        }

        self.revealed += 1;
        let text = self.content[..self.boundaries[self.revealed - 1]].to_string();
        let frame = TypewriterFrame::Partial {
            revealed: self.revealed,
            text,
        };
        Some((frame, self))
    }
}

/// Play `content` at `rate` per character
///
/// Nothing happens until the stream is polled. Empty content yields only
/// [`TypewriterFrame::Complete`]. Cancelling `cancel` (or dropping the
/// stream) ends playback; no frame is produced after cancellation. Once
/// ended, the stream keeps returning `None` when polled again.
pub fn play(
    content: impl Into<String>,
    rate: Duration,
    cancel: CancelToken,
) -> impl Stream<Item = TypewriterFrame> + Send + 'static {
    let content = content.into();
    let playback = Playback {
        boundaries: char_boundaries(&content),
        content,
        revealed: 0,
        rate: rate.max(MIN_RATE),
        ticker: None,
        cancel,
        finished: false,
    };
    stream::unfold(playback, Playback::step).fuse()
}

/// Progress of one playback, keyed by message id and content
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypewriterSession {
    /// Message id and the content being revealed
    pub key: (MessageId, String),
    /// Characters revealed so far
    pub revealed_length: usize,
    /// Whether every character has been revealed
    pub complete: bool,
}

impl TypewriterSession {
    fn new(id: MessageId, content: String) -> Self {
        Self {
            key: (id, content),
            revealed_length: 0,
            complete: false,
        }
    }

    /// Whether this session plays `content` for message `id`
    #[must_use]
    pub fn is_for(&self, id: &MessageId, content: &str) -> bool {
        self.key.0 == *id && self.key.1 == content
    }

    /// Message this session belongs to
    #[must_use]
    pub fn message_id(&self) -> &MessageId {
        &self.key.0
    }

    /// The currently revealed prefix
    #[must_use]
    pub fn visible_text(&self) -> &str {
        let content = &self.key.1;
        let end = content
            .char_indices()
            .nth(self.revealed_length)
            .map_or(content.len(), |(i, _)| i);
        &content[..end]
    }

    fn apply(&mut self, frame: &TypewriterFrame) {
        match frame {
            TypewriterFrame::Partial { revealed, .. } => self.revealed_length = *revealed,
            TypewriterFrame::Complete => {
                self.revealed_length = self.key.1.chars().count();
                self.complete = true;
            }
        }
    }
}

type FrameStream = Pin<Box<dyn Stream<Item = TypewriterFrame> + Send>>;

/// Drives a single typewriter playback for one subscriber
///
/// Call [`sync`](Self::sync) with the message that should be animated; a
/// different id or content cancels the running playback and starts again at
/// zero. Dropping the player cancels whatever is in flight.
pub struct TypewriterPlayer {
    config: TypewriterConfig,
    session: Option<TypewriterSession>,
    cancel: CancelToken,
    frames: Option<FrameStream>,
}

impl TypewriterPlayer {
    /// Create an idle player
    #[must_use]
    pub fn new(config: TypewriterConfig) -> Self {
        Self {
            config,
            session: None,
            cancel: CancelToken::new(),
            frames: None,
        }
    }

    /// Point the player at a message
    ///
    /// Returns `true` if a new playback was started, `false` if the player
    /// was already playing this exact key.
    pub fn sync(&mut self, id: &MessageId, content: &str) -> bool {
        if self
            .session
            .as_ref()
            .is_some_and(|session| session.is_for(id, content))
        {
            return false;
        }

        self.cancel();
        tracing::trace!(message_id = %id, chars = content.chars().count(), "Typewriter restart");

        self.cancel = CancelToken::new();
        self.session = Some(TypewriterSession::new(id.clone(), content.to_string()));
        self.frames = Some(Box::pin(play(content, self.config.rate, self.cancel.clone())));
        true
    }

    /// Stop the current playback and forget its progress
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.frames = None;
        self.session = None;
    }

    /// Current session, if any
    #[must_use]
    pub fn session(&self) -> Option<&TypewriterSession> {
        self.session.as_ref()
    }

    /// Whether a playback is waiting on its next frame
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.frames.is_some()
    }

    /// Revealed text for `id`/`content`, if that is what the player is playing
    #[must_use]
    pub fn visible_text(&self, id: &MessageId, content: &str) -> Option<&str> {
        self.session
            .as_ref()
            .filter(|session| session.is_for(id, content))
            .map(TypewriterSession::visible_text)
    }

    /// Wait for the next frame of the current playback
    ///
    /// Stays pending while nothing is playing, which makes it safe to use as
    /// a `tokio::select!` branch.
    pub async fn advance(&mut self) -> TypewriterFrame {
        loop {
            let Some(frames) = self.frames.as_mut() else {
                return std::future::pending().await;
            };

            match frames.next().await {
                Some(frame) => {
                    if let Some(session) = self.session.as_mut() {
                        session.apply(&frame);
                    }
                    if frame == TypewriterFrame::Complete {
                        self.frames = None;
                    }
                    return frame;
                }
                None => self.frames = None,
            }
        }
    }
}

impl Default for TypewriterPlayer {
    fn default() -> Self {
        Self::new(TypewriterConfig::default())
    }
}

impl Drop for TypewriterPlayer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for TypewriterPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypewriterPlayer")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("playing", &self.frames.is_some())
            .finish()
    }
}
