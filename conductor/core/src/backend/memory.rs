//! In-Memory Backend
//!
//! A conversation backend that keeps everything in process. Seeded with
//! conversations, it answers every send with a scripted (or echoed) agent
//! reply. Used by the TUI demo mode and by tests, which can inject failures,
//! add simulated latency, or hold a conversation's calls until released.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::traits::{ConversationBackend, SendAck};
use crate::error::BackendError;
use crate::messages::{AgentId, ConversationId, Message, MessageId, Sender};

/// A message recorded by [`InMemoryBackend::send_message`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentRecord {
    /// Target conversation
    pub conversation_id: ConversationId,
    /// Text as received
    pub content: String,
    /// Addressed agent
    pub agent_id: Option<AgentId>,
}

/// In-process conversation backend
#[derive(Default)]
pub struct InMemoryBackend {
    conversations: Mutex<HashMap<ConversationId, Vec<Message>>>,
    replies: Mutex<VecDeque<String>>,
    sent: Mutex<Vec<SentRecord>>,
    holds: Mutex<HashMap<ConversationId, watch::Sender<bool>>>,
    latency: Option<Duration>,
    fail_fetches: AtomicBool,
    fail_sends: AtomicBool,
    fetch_calls: AtomicUsize,
    send_calls: AtomicUsize,
    next_id: AtomicU64,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a conversation
    #[must_use]
    pub fn with_conversation(self, id: ConversationId, messages: Vec<Message>) -> Self {
        self.conversations.lock().insert(id, messages);
        self
    }

    /// Queue agent replies, consumed one per send
    #[must_use]
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .extend(replies.into_iter().map(Into::into));
        self
    }

    /// Delay every call by a fixed amount
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every fetch fail
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make every send fail
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Hold all calls for a conversation until [`release`](Self::release)
    pub fn hold(&self, id: &ConversationId) {
        let mut holds = self.holds.lock();
        match holds.get(id) {
            Some(tx) => {
                tx.send_replace(false);
            }
            None => {
                let (tx, _rx) = watch::channel(false);
                holds.insert(id.clone(), tx);
            }
        }
    }

    /// Let held calls for a conversation proceed
    pub fn release(&self, id: &ConversationId) {
        if let Some(tx) = self.holds.lock().get(id) {
            tx.send_replace(true);
        }
    }

    /// Number of fetches issued so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of sends issued so far
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    /// Every message handed to `send_message`, in order
    pub fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().clone()
    }

    /// Current stored sequence of a conversation
    pub fn conversation(&self, id: &ConversationId) -> Vec<Message> {
        self.conversations
            .lock()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    fn next_message_id(&self) -> MessageId {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        MessageId::new(format!("mem_{n}"))
    }

    fn reply_for(&self, content: &str) -> String {
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("Received: {content}"))
    }

    /// Wait out simulated latency and any hold on the conversation
    async fn gate(&self, id: &ConversationId) {
        if let Some(latency) = self.latency {
            // Simulated latency for demo mode
            tokio::time::sleep(latency).await;
        }

        let rx = self.holds.lock().get(id).map(watch::Sender::subscribe);
        if let Some(mut rx) = rx {
            // A dropped sender means the hold can never be lifted; proceed.
            let _ = rx.wait_for(|released| *released).await;
        }
    }
}

#[async_trait]
impl ConversationBackend for InMemoryBackend {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn fetch_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, BackendError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.gate(conversation_id).await;

        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(BackendError::Transport("simulated fetch failure".to_string()));
        }

        Ok(self.conversation(conversation_id))
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        agent_id: Option<&AgentId>,
    ) -> Result<SendAck, BackendError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(SentRecord {
            conversation_id: conversation_id.clone(),
            content: content.to_string(),
            agent_id: agent_id.cloned(),
        });
        self.gate(conversation_id).await;

        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(BackendError::Rejected("simulated send failure".to_string()));
        }

        let user_id = self.next_message_id();
        let reply = self.reply_for(content);
        let user = Message::settled(user_id.clone(), Sender::User, content, Utc::now());
        let agent = Message::settled(self.next_message_id(), Sender::Agent, reply.clone(), Utc::now());

        let mut conversations = self.conversations.lock();
        let sequence = conversations.entry(conversation_id.clone()).or_default();
        sequence.push(user);
        sequence.push(agent);

        Ok(SendAck {
            message_id: Some(user_id),
            reply: Some(reply),
        })
    }
}
