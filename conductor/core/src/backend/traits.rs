//! Conversation Backend Traits
//!
//! The chat pipeline talks to whatever owns persistence through this trait:
//! fetch a conversation's messages, send a new one. Implementations handle
//! transport details (HTTP, in-process, test doubles).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::messages::{AgentId, ConversationId, Message, MessageId};

/// Acknowledgement returned by a successful send
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendAck {
    /// Backend id assigned to the user's message, if reported
    #[serde(default)]
    pub message_id: Option<MessageId>,
    /// Agent reply text, if the backend returns it with the acknowledgement
    #[serde(default)]
    pub reply: Option<String>,
}

/// Conversation backend trait
///
/// Implement this trait to plug the chat pipeline into a different host.
#[async_trait]
pub trait ConversationBackend: Send + Sync {
    /// Get the backend name (e.g., "HTTP", "in-memory")
    fn name(&self) -> &str;

    /// Fetch the ordered message sequence of a conversation
    async fn fetch_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, BackendError>;

    /// Send a user message, optionally addressed to a specific agent
    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        agent_id: Option<&AgentId>,
    ) -> Result<SendAck, BackendError>;
}
