//! Render Projection
//!
//! Pure projection from a [`ConversationSnapshot`] to what a surface should
//! draw. One row per message, in insertion order. Streaming messages are
//! handed to the typewriter keyed by `(id, content)`; everything else is
//! shown verbatim. A loading conversation with no messages shows a loading
//! affordance instead of rows, and an error becomes a dismissible banner that
//! sits alongside existing rows.

use chrono::{DateTime, Utc};

use crate::controller::ConversationSnapshot;
use crate::messages::{Message, MessageId, Sender};

/// How a row's text is produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowBody {
    /// Show the content as is
    Verbatim(String),
    /// Reveal the content through the typewriter
    Typewriter {
        /// Message the playback belongs to
        id: MessageId,
        /// Full content to reveal
        content: String,
    },
}

/// One visual row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    /// Message id
    pub id: MessageId,
    /// Who sent it
    pub sender: Sender,
    /// When it was created
    pub timestamp: DateTime<Utc>,
    /// Text source
    pub body: RowBody,
}

impl Row {
    fn from_message(message: &Message) -> Self {
        let body = if message.streaming {
            RowBody::Typewriter {
                id: message.id.clone(),
                content: message.content.clone(),
            }
        } else {
            RowBody::Verbatim(message.content.clone())
        };
        Self {
            id: message.id.clone(),
            sender: message.sender,
            timestamp: message.timestamp,
            body,
        }
    }

    /// Whether this row is animated
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self.body, RowBody::Typewriter { .. })
    }
}

/// Dismissible error banner
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    /// Short title
    pub title: String,
    /// Full error text
    pub detail: String,
}

/// Everything a surface draws for one conversation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderView {
    /// Rows in display order
    pub rows: Vec<Row>,
    /// Show the loading affordance instead of rows
    pub loading_indicator: bool,
    /// Error banner, if any
    pub banner: Option<Banner>,
}

impl RenderView {
    /// The row currently handed to the typewriter, if any
    #[must_use]
    pub fn streaming_row(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.is_streaming())
    }
}

/// Project a snapshot into a view
#[must_use]
pub fn project(snapshot: &ConversationSnapshot) -> RenderView {
    let loading_indicator = snapshot.loading && snapshot.messages.is_empty();
    let rows = if loading_indicator {
        Vec::new()
    } else {
        snapshot.messages.iter().map(Row::from_message).collect()
    };
    let banner = snapshot.error.as_ref().map(|err| Banner {
        title: err.title().to_string(),
        detail: err.to_string(),
    });

    RenderView {
        rows,
        loading_indicator,
        banner,
    }
}
