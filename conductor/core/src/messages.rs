//! Conversation Messages
//!
//! The message record shared by the store, the controller and every render
//! surface, plus the identifiers that key it.
//!
//! # Identity
//!
//! Backend ids are opaque strings. Messages inserted locally before the
//! backend has confirmed them (the optimistic user message and the agent
//! placeholder) get a temporary id with the `tmp_` prefix. Temporary ids
//! never survive a reconciliation: the authoritative reload replaces them
//! wholesale.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix used for locally generated message ids
const TEMPORARY_PREFIX: &str = "tmp_";

/// Message identifier, unique within a conversation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Wrap an id handed out by the backend
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a temporary id for a message the backend has not seen yet
    pub fn temporary() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("{TEMPORARY_PREFIX}{id}"))
    }

    /// Whether this id was generated locally
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Conversation identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Wrap a conversation id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the agent a conversation talks to
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub String);

impl AgentId {
    /// Wrap an agent id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who wrote a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The person at the keyboard
    User,
    /// The software agent on the other end
    Agent,
}

impl Sender {
    /// Label shown next to the message
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Agent => "Agent",
        }
    }
}

/// A message in a conversation
///
/// `content` may only change while `streaming` is set. Once a message has
/// settled it is never edited; reconciliation swaps in the backend's copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id
    pub id: MessageId,
    /// Message text
    pub content: String,
    /// Who sent this message
    pub sender: Sender,
    /// When the message was created
    pub timestamp: DateTime<Utc>,
    /// Whether the final content is still outstanding
    ///
    /// Local only. Backend messages are always settled, so the flag is never
    /// read from the wire.
    #[serde(default, skip_deserializing)]
    pub streaming: bool,
}

impl Message {
    /// Create the optimistic copy of a message the user just sent
    pub fn user_optimistic(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::temporary(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            streaming: false,
        }
    }

    /// Create the agent placeholder that stands in for a pending reply
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::temporary(),
            content: String::new(),
            sender: Sender::Agent,
            timestamp: Utc::now(),
            streaming: true,
        }
    }

    /// Create a settled message, typically one decoded from the backend
    pub fn settled(
        id: MessageId,
        sender: Sender,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            sender,
            timestamp,
            streaming: false,
        }
    }

    /// Copy of this message with new streaming content
    ///
    /// Returns `None` for settled messages, whose content is immutable.
    #[must_use]
    pub fn with_streaming_content(&self, content: impl Into<String>) -> Option<Self> {
        if !self.streaming {
            return None;
        }
        Some(Self {
            content: content.into(),
            ..self.clone()
        })
    }
}
