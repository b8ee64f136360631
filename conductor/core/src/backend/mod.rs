//! Conversation Backend Integration
//!
//! Access to whatever persists conversations, through a common trait.
//!
//! # Available Backends
//!
//! - **HTTP**: the host process's REST interface
//! - **In-memory**: seeded, scriptable, used for demo mode and tests
//!
//! # Usage
//!
//! ```ignore
//! use twinchat_core::backend::{ConversationBackend, HttpBackend};
//!
//! let backend = HttpBackend::new("http://127.0.0.1:8787", Duration::from_secs(15))?;
//! let messages = backend.fetch_messages(&ConversationId::new("c1")).await?;
//! ```

mod http;
mod memory;
mod traits;

pub use http::HttpBackend;
pub use memory::{InMemoryBackend, SentRecord};
pub use traits::{ConversationBackend, SendAck};
