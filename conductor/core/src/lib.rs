//! twinchat Core - Headless Streaming Chat Pipeline
//!
//! This crate holds the chat pipeline of twinchat, independent of any UI
//! framework: optimistic sends, the streaming placeholder, reconciliation
//! against the backend, and the typewriter reveal of agent replies. It can
//! drive a TUI or run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Render Surface                          │
//! │     project(snapshot) → RenderView     TypewriterPlayer      │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!                 │ SurfaceEvent                 │ ConversationSnapshot
//!                 ▼                              │ (watch channel)
//! ┌──────────────────────────────────────────────┴───────────────┐
//! │                        Conductor                             │
//! │   ┌────────────────────────────────────────────────────────┐ │
//! │   │ ConversationController (one per bound conversation)    │ │
//! │   │   MessageStore   phase   error   in-flight task        │ │
//! │   └───────────────────────────┬────────────────────────────┘ │
//! └───────────────────────────────┼──────────────────────────────┘
//!                                 ▼
//!                     ConversationBackend (HTTP / in-memory)
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: binds conversations and publishes snapshots
//! - [`ConversationController`]: load, optimistic send, rollback, reconcile
//! - [`MessageStore`]: ordered messages of one conversation
//! - [`TypewriterPlayer`]: character-by-character reveal
//! - [`RenderView`]: what a surface draws, from [`project`]
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use twinchat_core::{Conductor, ConductorConfig, InMemoryBackend, SurfaceEvent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(InMemoryBackend::new());
//!     let mut conductor = Conductor::new(backend, ConductorConfig::default());
//!
//!     conductor.handle_event(SurfaceEvent::bind("c1"));
//!     conductor.handle_event(SurfaceEvent::send("hello"));
//!     conductor.settle().await;
//!
//!     let view = twinchat_core::project(&conductor.snapshot());
//!     println!("{} rows", view.rows.len());
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`animation`]: typewriter playback
//! - [`backend`]: conversation backend trait and implementations
//! - [`conductor`]: binding and snapshot publication
//! - [`config`]: TOML/environment configuration
//! - [`controller`]: per-conversation state machine
//! - [`error`]: error types
//! - [`events`]: events from surfaces
//! - [`messages`]: message records and identifiers
//! - [`render`]: snapshot-to-view projection
//! - [`store`]: the message store
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod backend;
pub mod conductor;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod messages;
pub mod render;
pub mod store;

// Re-exports for convenience
pub use animation::{
    play, CancelToken, TypewriterConfig, TypewriterFrame, TypewriterPlayer, TypewriterSession,
    DEFAULT_RATE,
};
pub use backend::{ConversationBackend, HttpBackend, InMemoryBackend, SendAck, SentRecord};
pub use conductor::{Conductor, ConductorConfig};
pub use controller::{
    Completion, CompletionKind, ControllerPhase, ControllerSettings, ConversationController,
    ConversationSnapshot, SendOutcome,
};
pub use error::{BackendError, ChatError, FetchError, SendError};
pub use events::SurfaceEvent;
pub use messages::{AgentId, ConversationId, Message, MessageId, Sender};
pub use render::{project, Banner, RenderView, Row, RowBody};
pub use store::MessageStore;

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, BackendSettings, ClientConfig,
    ConfigError, ConfigOverrides, ConfigSource,
};
