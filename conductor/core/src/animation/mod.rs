//! Animation System - Surface-Agnostic Reveal Timing
//!
//! Animation primitives that are independent of any specific rendering
//! surface. The core describes what is revealed and when; each surface
//! decides how a partially revealed message is drawn.
//!
//! # Architecture
//!
//! ```text
//! RenderView (row marked Typewriter { id, content })
//!     │
//!     └─→ TypewriterPlayer (one per surface, keyed by id + content)
//!             │
//!             └─→ play() stream: Partial, Partial, ..., Complete
//! ```

mod typewriter;

pub use typewriter::{
    play, CancelToken, TypewriterConfig, TypewriterFrame, TypewriterPlayer, TypewriterSession,
    DEFAULT_RATE,
};
