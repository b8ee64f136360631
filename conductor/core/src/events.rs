//! Surface Events
//!
//! Events sent from a render surface to the Conductor. Surfaces are "dumb"
//! renderers: they report what the user did and the Conductor decides what it
//! means for the bound conversation.

use serde::{Deserialize, Serialize};

use crate::messages::{AgentId, ConversationId};

/// Events from a render surface to the Conductor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// Show a conversation, replacing whatever was bound
    Bind {
        /// Conversation to load
        conversation_id: ConversationId,
        /// Agent sends are addressed to, overriding the configured default
        agent_id: Option<AgentId>,
    },

    /// Stop showing the current conversation
    Unbind,

    /// Reload the bound conversation from scratch
    Reload,

    /// User submitted a message
    Send {
        /// Text as typed
        text: String,
    },

    /// User dismissed the error banner
    DismissError,
}

impl SurfaceEvent {
    /// Bind a conversation with the default agent
    pub fn bind(conversation_id: impl Into<String>) -> Self {
        Self::Bind {
            conversation_id: ConversationId::new(conversation_id),
            agent_id: None,
        }
    }

    /// Send a message
    pub fn send(text: impl Into<String>) -> Self {
        Self::Send { text: text.into() }
    }
}
