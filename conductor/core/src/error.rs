//! Error Types
//!
//! Backend failures are wrapped into the two user-visible kinds the chat
//! pipeline knows about: a failed load and a failed send. Neither is fatal;
//! both end up in the conversation's `error` field as a banner.

use thiserror::Error;

use crate::messages::ConversationId;

/// Errors raised by a conversation backend
#[derive(Clone, Debug, Error)]
pub enum BackendError {
    /// The request never produced a response
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The response could not be decoded
    #[error("malformed backend response: {0}")]
    Decode(String),

    /// The backend refused the request
    #[error("backend rejected request: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Loading a conversation's messages failed
#[derive(Clone, Debug, Error)]
#[error("could not load conversation {conversation_id}: {source}")]
pub struct FetchError {
    /// Conversation being loaded
    pub conversation_id: ConversationId,
    /// Underlying backend failure
    #[source]
    pub source: BackendError,
}

/// Sending a message failed
#[derive(Clone, Debug, Error)]
pub enum SendError {
    /// The backend did not accept the message
    #[error("message to {conversation_id} was not delivered: {source}")]
    Backend {
        /// Conversation the message was sent to
        conversation_id: ConversationId,
        /// Underlying backend failure
        #[source]
        source: BackendError,
    },

    /// The text exceeds the configured input limit
    #[error("message is {length} characters long, the limit is {limit}")]
    InputTooLong {
        /// Length of the rejected text in characters
        length: usize,
        /// Configured maximum
        limit: usize,
    },
}

/// The error shown to the user for one conversation
#[derive(Clone, Debug, Error)]
pub enum ChatError {
    /// Load failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Send failed
    #[error(transparent)]
    Send(#[from] SendError),
}

impl ChatError {
    /// Short banner title for this error
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "Could not load messages",
            Self::Send(_) => "Message not sent",
        }
    }
}
