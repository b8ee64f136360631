//! Message Store
//!
//! The ordered message sequence of one conversation. Insertion order is
//! display order. The store only ever grows at the tail; everything else is
//! either a targeted replace/remove or a full reload that swaps in the
//! backend's authoritative sequence.
//!
//! Persistence lives entirely behind the [`ConversationBackend`]; the store
//! itself has no side effects beyond its in-memory `Vec`.

use crate::backend::ConversationBackend;
use crate::error::FetchError;
use crate::messages::{ConversationId, Message, MessageId};

/// Ordered messages for a single conversation
#[derive(Clone, Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the conversation from the backend and replace the sequence
    ///
    /// On failure the current sequence is left untouched; callers decide how
    /// to degrade.
    pub async fn load<B: ConversationBackend + ?Sized>(
        &mut self,
        backend: &B,
        conversation_id: &ConversationId,
    ) -> Result<&[Message], FetchError> {
        let messages = fetch_sequence(backend, conversation_id).await?;
        self.replace_all(messages);
        Ok(&self.messages)
    }

    /// Replace the whole sequence
    ///
    /// Optimistic and placeholder entries are discarded, not merged.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Insert a message at the tail
    pub fn append(&mut self, message: Message) {
        if message.streaming && self.streaming_count() > 0 {
            tracing::warn!(
                id = %message.id,
                "Appending a second streaming message to the store"
            );
        }
        self.messages.push(message);
    }

    /// Replace the message with the given id, keeping its position
    ///
    /// Returns `false` if no message has that id.
    pub fn replace(&mut self, id: &MessageId, message: Message) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(slot) => {
                *slot = message;
                true
            }
            None => false,
        }
    }

    /// Remove every message matching the predicate, returning how many went
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Message) -> bool,
    {
        let before = self.messages.len();
        self.messages.retain(|m| !predicate(m));
        before - self.messages.len()
    }

    /// Drop every message
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Get message by id
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// The message currently awaiting its final content, if any
    pub fn streaming_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.streaming)
    }

    /// Number of messages flagged as streaming
    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.streaming).count()
    }

    /// All messages in display order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Fetch a conversation's authoritative sequence
///
/// Every message the backend returns is settled; a streaming flag set by the
/// backend is cleared.
pub async fn fetch_sequence<B: ConversationBackend + ?Sized>(
    backend: &B,
    conversation_id: &ConversationId,
) -> Result<Vec<Message>, FetchError> {
    let mut messages = backend
        .fetch_messages(conversation_id)
        .await
        .map_err(|source| FetchError {
            conversation_id: conversation_id.clone(),
            source,
        })?;

    let streaming = messages.iter().filter(|m| m.streaming).count();
    if streaming > 0 {
        tracing::warn!(
            conversation_id = %conversation_id,
            streaming,
            "Backend returned streaming messages, treating them as settled"
        );
        for message in &mut messages {
            message.streaming = false;
        }
    }
    Ok(messages)
}
