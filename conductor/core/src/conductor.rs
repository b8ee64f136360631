//! Conductor - Conversation Binding and Publication
//!
//! The Conductor sits between a render surface and the per-conversation
//! controllers. It:
//! - Maps [`SurfaceEvent`]s to controller calls
//! - Constructs a fresh [`ConversationController`] on bind and discards it on
//!   unbind; there is never more than one
//! - Publishes a whole [`ConversationSnapshot`] after every change, through a
//!   `tokio::sync::watch` channel
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. A TUI, a test harness or a headless driver all
//! talk to it the same way: events in, snapshots out.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::backend::ConversationBackend;
use crate::config::ClientConfig;
use crate::controller::{
    ControllerPhase, ControllerSettings, ConversationController, ConversationSnapshot,
    SendOutcome,
};
use crate::events::SurfaceEvent;
use crate::messages::{AgentId, ConversationId};

/// Conductor configuration
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Agent used when a bind does not name one
    pub default_agent: Option<AgentId>,
    /// Longest accepted message, in characters
    pub max_input_length: usize,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        let settings = ControllerSettings::default();
        Self {
            default_agent: settings.agent_id,
            max_input_length: settings.max_input_length,
        }
    }
}

impl From<&ClientConfig> for ConductorConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            default_agent: config.default_agent.clone(),
            max_input_length: config.max_input_length,
        }
    }
}

/// The Conductor - owns the bound conversation
pub struct Conductor<B: ConversationBackend + ?Sized> {
    /// Configuration
    config: ConductorConfig,
    /// Conversation backend
    backend: Arc<B>,
    /// Controller of the bound conversation
    controller: Option<ConversationController<B>>,
    /// Agent override of the current binding
    bound_agent: Option<AgentId>,
    /// Latest published snapshot
    snapshot_tx: watch::Sender<ConversationSnapshot>,
}

impl<B: ConversationBackend + ?Sized + 'static> Conductor<B> {
    /// Create a Conductor with nothing bound
    pub fn new(backend: Arc<B>, config: ConductorConfig) -> Self {
        let (snapshot_tx, _) = watch::channel(ConversationSnapshot::default());
        tracing::info!(backend = backend.name(), "Conductor created");
        Self {
            config,
            backend,
            controller: None,
            bound_agent: None,
            snapshot_tx,
        }
    }

    /// Subscribe to snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Snapshot updates as a stream, starting with the current one
    pub fn snapshots(&self) -> WatchStream<ConversationSnapshot> {
        WatchStream::new(self.snapshot_tx.subscribe())
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ConversationSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Currently bound conversation
    pub fn bound(&self) -> Option<&ConversationId> {
        self.controller
            .as_ref()
            .map(ConversationController::conversation_id)
    }

    /// Controller of the bound conversation
    pub fn controller(&self) -> Option<&ConversationController<B>> {
        self.controller.as_ref()
    }

    /// Handle an event from the surface
    pub fn handle_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Bind {
                conversation_id,
                agent_id,
            } => self.bind(conversation_id, agent_id),

            SurfaceEvent::Unbind => self.unbind(),

            SurfaceEvent::Reload => {
                if let Some(conversation_id) = self.bound().cloned() {
                    let agent_id = self.bound_agent.clone();
                    self.bind(conversation_id, agent_id);
                }
            }

            SurfaceEvent::Send { text } => {
                self.send(&text);
            }

            SurfaceEvent::DismissError => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.dismiss_error();
                    self.publish();
                }
            }
        }
    }

    /// Send a message to the bound conversation
    ///
    /// Ignored when nothing is bound.
    pub fn send(&mut self, text: &str) -> SendOutcome {
        let Some(controller) = self.controller.as_mut() else {
            return SendOutcome::Ignored;
        };
        let outcome = controller.send(text);
        if outcome != SendOutcome::Ignored {
            self.publish();
        }
        outcome
    }

    /// Wait for the bound controller's next backend result and apply it
    ///
    /// Pending while nothing is bound, so it can sit in a `tokio::select!`.
    pub async fn next_completion(&mut self) {
        let Some(controller) = self.controller.as_mut() else {
            return std::future::pending().await;
        };
        let completion = controller.next_completion().await;
        controller.apply(completion);
        self.publish();
    }

    /// Apply results until the bound conversation is idle
    pub async fn settle(&mut self) {
        while self.controller.as_ref().is_some_and(|controller| {
            matches!(
                controller.phase(),
                ControllerPhase::Loading | ControllerPhase::Sending
            )
        }) {
            self.next_completion().await;
        }
    }

    fn bind(&mut self, conversation_id: ConversationId, agent_id: Option<AgentId>) {
        // Dropping the old controller aborts its tasks and closes its channel
        if let Some(previous) = self.controller.take() {
            tracing::debug!(
                from = %previous.conversation_id(),
                to = %conversation_id,
                "Rebinding conversation"
            );
        }

        let settings = ControllerSettings {
            agent_id: agent_id.clone().or_else(|| self.config.default_agent.clone()),
            max_input_length: self.config.max_input_length,
        };
        let mut controller =
            ConversationController::new(Arc::clone(&self.backend), conversation_id, settings);
        controller.mount();

        self.bound_agent = agent_id;
        self.controller = Some(controller);
        self.publish();
    }

    fn unbind(&mut self) {
        if let Some(previous) = self.controller.take() {
            tracing::debug!(conversation_id = %previous.conversation_id(), "Unbinding conversation");
        }
        self.bound_agent = None;
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self
            .controller
            .as_ref()
            .map(ConversationController::snapshot)
            .unwrap_or_default();
        self.snapshot_tx.send_replace(snapshot);
    }
}

impl<B: ConversationBackend + ?Sized> std::fmt::Debug for Conductor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conductor")
            .field("config", &self.config)
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}
