//! Demo Mode
//!
//! An in-process backend seeded with two maintenance conversations, so the
//! surface can be tried without a running host. Calls are delayed a little
//! to make the loading state and the typewriter visible.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use twinchat_core::{ConversationId, InMemoryBackend, Message, MessageId, Sender};

/// Conversations the demo backend knows about
pub const DEMO_CONVERSATIONS: [&str; 2] = ["pump-station-3", "hvac-north-wing"];

/// Per-call latency of the demo backend
///
/// Longer than it takes to reveal any scripted reply at the default rate, so
/// the reconciling fetch lands after the typewriter has finished.
pub const DEMO_LATENCY: Duration = Duration::from_millis(1200);

const DEMO_REPLIES: [&str; 4] = [
    "Drive-end vibration is in tolerance.",
    "Next inspection in two weeks.",
    "Supply air is 14.2 °C, near setpoint.",
    "No alarms in the last 24 hours.",
];

fn seeded(id: &str, exchange: &[(Sender, &str)]) -> Vec<Message> {
    let start = Utc::now() - ChronoDuration::minutes(30);
    exchange
        .iter()
        .enumerate()
        .map(|(i, (sender, content))| {
            let offset = ChronoDuration::minutes(i64::try_from(i).unwrap_or(0) * 2);
            Message::settled(
                MessageId::new(format!("{id}-{i}")),
                *sender,
                *content,
                start + offset,
            )
        })
        .collect()
}

/// Build the demo backend
pub fn demo_backend() -> InMemoryBackend {
    InMemoryBackend::new()
        .with_conversation(
            ConversationId::new(DEMO_CONVERSATIONS[0]),
            seeded(
                DEMO_CONVERSATIONS[0],
                &[
                    (Sender::User, "How is pump 3 doing after the maintenance?"),
                    (Sender::Agent, "Flow rate is stable at 42 m³/h."),
                ],
            ),
        )
        .with_conversation(
            ConversationId::new(DEMO_CONVERSATIONS[1]),
            seeded(
                DEMO_CONVERSATIONS[1],
                &[(Sender::User, "Any alarms on the north wing AHU?")],
            ),
        )
        .with_replies(DEMO_REPLIES)
        .with_latency(DEMO_LATENCY)
}

/// Conversation ids of the demo, in Tab order
pub fn demo_conversations() -> Vec<ConversationId> {
    DEMO_CONVERSATIONS
        .iter()
        .map(|id| ConversationId::new(*id))
        .collect()
}
