//! Conversation Controller
//!
//! One controller per bound conversation. It owns the conversation's
//! view-state (messages, loading, error) and drives it through a small state
//! machine:
//!
//! ```text
//!   Idle ──mount──→ Loading ──loaded/failed──→ Ready ⇄ Sending
//! ```
//!
//! `send` mutates the store synchronously (optimistic user message plus a
//! streaming placeholder) and hands the network call to a background task.
//! Every backend call reports back as a [`Completion`] on a channel owned by
//! this controller. Completions are applied one at a time by
//! [`ConversationController::apply`], so a consumer never sees a half-applied
//! result.
//!
//! Dropping a controller aborts its in-flight task. Its channel goes with
//! it, so a result for a conversation that is no longer bound can never reach
//! the one that replaced it.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::backend::{ConversationBackend, SendAck};
use crate::error::{ChatError, FetchError, SendError};
use crate::messages::{AgentId, ConversationId, Message, MessageId};
use crate::store::{fetch_sequence, MessageStore};

/// Controller state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerPhase {
    /// Created, nothing requested yet
    #[default]
    Idle,
    /// Initial fetch in flight
    Loading,
    /// Settled; accepts sends
    Ready,
    /// A send (and its reconciliation) is in flight
    Sending,
}

/// Per-conversation settings
#[derive(Clone, Debug)]
pub struct ControllerSettings {
    /// Agent every send is addressed to
    pub agent_id: Option<AgentId>,
    /// Longest accepted message, in characters
    pub max_input_length: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            agent_id: None,
            max_input_length: 8000,
        }
    }
}

/// What a call to [`ConversationController::send`] did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Optimistic messages were appended and the send is in flight
    Accepted,
    /// Empty or whitespace-only text, or no conversation loaded; nothing changed
    Ignored,
    /// Another send or the initial load is still outstanding
    Busy,
    /// Text exceeded the input limit; the error field is set
    TooLong,
}

/// Result of a background backend call
#[derive(Debug)]
pub enum CompletionKind {
    /// Initial fetch finished
    Loaded(Result<Vec<Message>, FetchError>),
    /// Send finished
    Sent {
        /// Placeholder inserted for this send
        placeholder: MessageId,
        /// Backend outcome
        result: Result<SendAck, SendError>,
    },
    /// Authoritative reload after a successful send finished
    Reconciled(Result<Vec<Message>, FetchError>),
}

/// A finished backend call, tagged with the conversation it was issued for
#[derive(Debug)]
pub struct Completion {
    /// Conversation the call was issued for
    pub conversation_id: ConversationId,
    /// What finished
    pub kind: CompletionKind,
}

/// Everything a render surface needs for one conversation
#[derive(Clone, Debug, Default)]
pub struct ConversationSnapshot {
    /// Bound conversation, `None` when nothing is bound
    pub conversation_id: Option<ConversationId>,
    /// Messages in display order
    pub messages: Vec<Message>,
    /// Initial load in flight
    pub loading: bool,
    /// Error banner, if any
    pub error: Option<ChatError>,
    /// Controller state
    pub phase: ControllerPhase,
}

/// Controller for a single conversation
pub struct ConversationController<B: ConversationBackend + ?Sized> {
    conversation_id: ConversationId,
    settings: ControllerSettings,
    backend: Arc<B>,
    store: MessageStore,
    phase: ControllerPhase,
    error: Option<ChatError>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: Option<JoinHandle<()>>,
}

impl<B: ConversationBackend + ?Sized + 'static> ConversationController<B> {
    /// Create a controller for `conversation_id`; call [`mount`](Self::mount) to load it
    pub fn new(
        backend: Arc<B>,
        conversation_id: ConversationId,
        settings: ControllerSettings,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            conversation_id,
            settings,
            backend,
            store: MessageStore::new(),
            phase: ControllerPhase::Idle,
            error: None,
            completions_tx,
            completions_rx,
            in_flight: None,
        }
    }

    /// Bound conversation
    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Current state
    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    /// Whether the initial load is in flight
    pub fn is_loading(&self) -> bool {
        self.phase == ControllerPhase::Loading
    }

    /// Current error, if any
    pub fn error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    /// Messages in display order
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// The underlying store
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Copy of the view-state
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            conversation_id: Some(self.conversation_id.clone()),
            messages: self.store.messages().to_vec(),
            loading: self.is_loading(),
            error: self.error.clone(),
            phase: self.phase,
        }
    }

    /// Start loading the conversation
    ///
    /// Does not retry on failure; mounting again is the retry.
    pub fn mount(&mut self) {
        tracing::debug!(conversation_id = %self.conversation_id, "Mounting conversation");
        self.set_phase(ControllerPhase::Loading);

        let backend = Arc::clone(&self.backend);
        let conversation_id = self.conversation_id.clone();
        self.spawn(async move {
            CompletionKind::Loaded(fetch_sequence(backend.as_ref(), &conversation_id).await)
        });
    }

    /// Send a user message
    ///
    /// When accepted, the store holds the optimistic user message followed
    /// by the streaming placeholder by the time this returns. The text is
    /// sent as typed, without trimming.
    pub fn send(&mut self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        match self.phase {
            ControllerPhase::Idle => return SendOutcome::Ignored,
            ControllerPhase::Loading | ControllerPhase::Sending => {
                tracing::debug!(
                    conversation_id = %self.conversation_id,
                    phase = ?self.phase,
                    "Send rejected, controller busy"
                );
                return SendOutcome::Busy;
            }
            ControllerPhase::Ready => {}
        }

        if self.store.streaming_count() > 0 {
            tracing::warn!(
                conversation_id = %self.conversation_id,
                "Send rejected, a placeholder is still streaming"
            );
            return SendOutcome::Busy;
        }

        let length = text.chars().count();
        if length > self.settings.max_input_length {
            self.error = Some(
                SendError::InputTooLong {
                    length,
                    limit: self.settings.max_input_length,
                }
                .into(),
            );
            return SendOutcome::TooLong;
        }

        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id.clone();
        self.store.append(Message::user_optimistic(text));
        self.store.append(placeholder);
        self.set_phase(ControllerPhase::Sending);

        let backend = Arc::clone(&self.backend);
        let conversation_id = self.conversation_id.clone();
        let agent_id = self.settings.agent_id.clone();
        let content = text.to_string();
        self.spawn(async move {
            let result = backend
                .send_message(&conversation_id, &content, agent_id.as_ref())
                .await
                .map_err(|source| SendError::Backend {
                    conversation_id: conversation_id.clone(),
                    source,
                });
            CompletionKind::Sent {
                placeholder: placeholder_id,
                result,
            }
        });

        SendOutcome::Accepted
    }

    /// Clear the error banner
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Wait for the next finished backend call
    ///
    /// Stays pending while nothing is in flight.
    pub async fn next_completion(&mut self) -> Completion {
        match self.completions_rx.recv().await {
            Some(completion) => completion,
            // The controller holds a sender, so the channel cannot close
            None => std::future::pending().await,
        }
    }

    /// Apply a finished backend call to the view-state
    ///
    /// Completions issued for another conversation are discarded.
    pub fn apply(&mut self, completion: Completion) {
        if completion.conversation_id != self.conversation_id {
            tracing::debug!(
                bound = %self.conversation_id,
                stale = %completion.conversation_id,
                "Discarding completion for a conversation that is no longer bound"
            );
            return;
        }

        match completion.kind {
            CompletionKind::Loaded(result) | CompletionKind::Reconciled(result) => {
                self.finish_load(result);
            }
            CompletionKind::Sent {
                placeholder,
                result: Ok(ack),
            } => self.finish_send(&placeholder, ack),
            CompletionKind::Sent {
                result: Err(err), ..
            } => self.fail_send(err),
        }
    }

    /// Apply completions until nothing is in flight
    pub async fn settle(&mut self) {
        while matches!(
            self.phase,
            ControllerPhase::Loading | ControllerPhase::Sending
        ) {
            let completion = self.next_completion().await;
            self.apply(completion);
        }
    }

    fn finish_load(&mut self, result: Result<Vec<Message>, FetchError>) {
        match result {
            Ok(messages) => {
                tracing::debug!(
                    conversation_id = %self.conversation_id,
                    count = messages.len(),
                    "Conversation loaded"
                );
                self.store.replace_all(messages);
                self.error = None;
            }
            Err(err) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id,
                    error = %err,
                    "Conversation load failed"
                );
                self.store.clear();
                self.error = Some(err.into());
            }
        }
        self.set_phase(ControllerPhase::Ready);
    }

    fn finish_send(&mut self, placeholder: &MessageId, ack: SendAck) {
        tracing::debug!(
            conversation_id = %self.conversation_id,
            message_id = ?ack.message_id,
            "Send acknowledged, reconciling"
        );

        // Reveal the reply while the authoritative reload is in flight
        if let Some(reply) = ack.reply {
            let updated = self
                .store
                .get(placeholder)
                .and_then(|message| message.with_streaming_content(reply));
            if let Some(updated) = updated {
                self.store.replace(placeholder, updated);
            }
        }

        let backend = Arc::clone(&self.backend);
        let conversation_id = self.conversation_id.clone();
        self.spawn(async move {
            CompletionKind::Reconciled(fetch_sequence(backend.as_ref(), &conversation_id).await)
        });
    }

    fn fail_send(&mut self, err: SendError) {
        tracing::warn!(
            conversation_id = %self.conversation_id,
            error = %err,
            "Send failed"
        );
        let removed = self.store.remove_where(|message| message.streaming);
        tracing::trace!(removed, "Dropped streaming placeholder");
        self.error = Some(err.into());
        self.set_phase(ControllerPhase::Ready);
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = CompletionKind> + Send + 'static,
    {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let tx = self.completions_tx.clone();
        let conversation_id = self.conversation_id.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let kind = task.await;
            // Receiver gone means the controller was dropped
            let _ = tx.send(Completion {
                conversation_id,
                kind,
            });
        }));
    }

    fn set_phase(&mut self, phase: ControllerPhase) {
        if self.phase != phase {
            tracing::trace!(from = ?self.phase, to = ?phase, "Controller phase change");
            self.phase = phase;
        }
    }
}

impl<B: ConversationBackend + ?Sized> Drop for ConversationController<B> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

impl<B: ConversationBackend + ?Sized> std::fmt::Debug for ConversationController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationController")
            .field("conversation_id", &self.conversation_id)
            .field("backend", &self.backend.name())
            .field("phase", &self.phase)
            .field("messages", &self.store.len())
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
