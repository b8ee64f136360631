//! Integration tests for the streaming chat pipeline
//!
//! These tests drive the public API end to end, the way a render surface
//! would: events into the Conductor, snapshots out, projected into a view
//! and animated by the typewriter.
//! Tests cover:
//! - Optimistic send followed by reconciliation
//! - Send failure rollback
//! - Blank input
//! - Conversation switching with a pending load
//! - The single-placeholder invariant across every observed snapshot
//! - Typewriter playback of the streaming row
//! - TOML configuration feeding the Conductor

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use tokio_test::{assert_pending, assert_ready};

use twinchat_core::config::load_config_from_path;
use twinchat_core::{
    project, ChatError, Conductor, ConductorConfig, ConversationId, InMemoryBackend, Message,
    MessageId, RowBody, Sender, SendOutcome, SurfaceEvent, TypewriterConfig, TypewriterFrame,
    TypewriterPlayer,
};

fn conversation() -> ConversationId {
    ConversationId::new("twin-42")
}

fn history() -> Vec<Message> {
    let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
    vec![
        Message::settled(MessageId::new("A"), Sender::User, "How is pump 3?", ts),
        Message::settled(MessageId::new("B"), Sender::Agent, "Nominal.", ts),
    ]
}

async fn bound(backend: Arc<InMemoryBackend>) -> Conductor<InMemoryBackend> {
    let mut conductor = Conductor::new(backend, ConductorConfig::default());
    conductor.handle_event(SurfaceEvent::Bind {
        conversation_id: conversation(),
        agent_id: None,
    });
    conductor.settle().await;
    conductor
}

// =============================================================================
// Send and reconcile
// =============================================================================

/// `[A, B]` + send("hi") shows `[A, B, U, P]` immediately, then exactly the
/// backend's sequence once reconciled.
#[tokio::test]
async fn test_send_then_reconcile_scenario() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_conversation(conversation(), history())
            .with_replies(["reply"]),
    );
    let mut conductor = bound(backend.clone()).await;

    assert_eq!(conductor.send("hi"), SendOutcome::Accepted);

    let snapshot = conductor.snapshot();
    assert_eq!(snapshot.messages.len(), 4);
    assert_eq!(&snapshot.messages[..2], history().as_slice());
    let user = &snapshot.messages[2];
    assert_eq!((user.sender, user.content.as_str(), user.streaming), (Sender::User, "hi", false));
    let placeholder = &snapshot.messages[3];
    assert_eq!(
        (placeholder.sender, placeholder.content.as_str(), placeholder.streaming),
        (Sender::Agent, "", true)
    );

    conductor.settle().await;

    let expected = backend.conversation(&conversation());
    assert_eq!(conductor.snapshot().messages, expected);
    assert_eq!(expected[2].content, "hi");
    assert_eq!(expected[3].content, "reply");
    assert!(conductor.snapshot().messages.iter().all(|m| !m.streaming));
}

/// A failed send leaves `[A, B, U]`, sets the error and removes the placeholder.
#[tokio::test]
async fn test_send_failure_scenario() {
    let backend = Arc::new(InMemoryBackend::new().with_conversation(conversation(), history()));
    let mut conductor = bound(backend.clone()).await;
    backend.fail_sends(true);

    conductor.send("hi");
    conductor.settle().await;

    let snapshot = conductor.snapshot();
    let contents: Vec<_> = snapshot.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["How is pump 3?", "Nominal.", "hi"]);
    assert!(matches!(snapshot.error, Some(ChatError::Send(_))));
    assert!(snapshot.messages.iter().all(|m| !m.streaming));

    let view = project(&snapshot);
    assert_eq!(view.rows.len(), 3);
    assert_eq!(view.banner.map(|b| b.title), Some("Message not sent".to_string()));
}

#[tokio::test]
async fn test_blank_sends_do_nothing() {
    let backend = Arc::new(InMemoryBackend::new().with_conversation(conversation(), history()));
    let mut conductor = bound(backend.clone()).await;
    let before = conductor.snapshot().messages;

    conductor.handle_event(SurfaceEvent::send(""));
    conductor.handle_event(SurfaceEvent::send("   "));
    tokio::task::yield_now().await;

    assert_eq!(conductor.snapshot().messages, before);
    assert_eq!(backend.send_calls(), 0);
}

// =============================================================================
// Conversation switching
// =============================================================================

#[tokio::test]
async fn test_switch_discards_pending_load() {
    let old = ConversationId::new("old");
    let new = ConversationId::new("new");
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_conversation(old.clone(), history())
            .with_conversation(new.clone(), Vec::new()),
    );
    backend.hold(&old);

    let mut conductor = Conductor::new(backend.clone(), ConductorConfig::default());
    conductor.handle_event(SurfaceEvent::Bind {
        conversation_id: old.clone(),
        agent_id: None,
    });
    tokio::task::yield_now().await;

    conductor.handle_event(SurfaceEvent::Bind {
        conversation_id: new.clone(),
        agent_id: None,
    });
    conductor.settle().await;
    backend.release(&old);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    // Nothing from the old conversation arrives, even once it is released
    let mut completion = tokio_test::task::spawn(conductor.next_completion());
    assert_pending!(completion.poll());
    drop(completion);

    let snapshot = conductor.snapshot();
    assert_eq!(snapshot.conversation_id, Some(new));
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_switch_discards_pending_send() {
    let first = ConversationId::new("first");
    let second = ConversationId::new("second");
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_conversation(first.clone(), history())
            .with_conversation(second.clone(), Vec::new()),
    );

    let mut conductor = Conductor::new(backend.clone(), ConductorConfig::default());
    conductor.handle_event(SurfaceEvent::Bind {
        conversation_id: first.clone(),
        agent_id: None,
    });
    conductor.settle().await;

    backend.hold(&first);
    conductor.send("hi");
    conductor.handle_event(SurfaceEvent::Bind {
        conversation_id: second.clone(),
        agent_id: None,
    });
    conductor.settle().await;
    backend.release(&first);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    let snapshot = conductor.snapshot();
    assert_eq!(snapshot.conversation_id, Some(second));
    assert!(snapshot.messages.is_empty());
    assert!(snapshot.error.is_none());
}

// =============================================================================
// Invariants over published snapshots
// =============================================================================

#[tokio::test]
async fn test_at_most_one_streaming_message_observed() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_conversation(conversation(), history())
            .with_replies(["one", "two", "three"]),
    );
    let mut conductor = Conductor::new(backend.clone(), ConductorConfig::default());
    let mut snapshots = conductor.snapshots();

    conductor.handle_event(SurfaceEvent::bind(conversation().as_str()));
    conductor.settle().await;
    for text in ["a", "b", "c"] {
        assert_eq!(conductor.send(text), SendOutcome::Accepted);
        let pending = conductor.snapshot();
        assert_eq!(pending.messages.iter().filter(|m| m.streaming).count(), 1);
        // Rejected while the first is in flight
        assert_eq!(conductor.send("extra"), SendOutcome::Busy);
        conductor.settle().await;
    }
    backend.fail_sends(true);
    conductor.send("d");
    conductor.settle().await;
    drop(conductor);

    let mut observed = 0;
    while let Some(snapshot) = snapshots.next().await {
        observed += 1;
        let streaming = snapshot.messages.iter().filter(|m| m.streaming).count();
        assert!(streaming <= 1, "snapshot with {streaming} streaming messages");
    }
    assert!(observed > 0);
    assert_eq!(backend.send_calls(), 4);
}

// =============================================================================
// Typewriter over the projection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_streaming_row_revealed_by_typewriter() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_conversation(conversation(), history())
            .with_replies(["ok!"]),
    );
    let mut conductor = bound(backend.clone()).await;

    conductor.send("status?");
    // Let the send finish, then hold the reconciling reload so only the
    // acknowledgement is applied and the reply lands in the placeholder
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    backend.hold(&conversation());
    conductor.next_completion().await;
    backend.release(&conversation());

    let view = project(&conductor.snapshot());
    let row = view.streaming_row().expect("streaming row");
    let RowBody::Typewriter { id, content } = &row.body else {
        panic!("streaming row must use the typewriter");
    };
    assert_eq!(content, "ok!");

    let mut player = TypewriterPlayer::new(TypewriterConfig::from_millis(30));
    assert!(player.sync(id, content));

    let mut revealed = Vec::new();
    loop {
        match player.advance().await {
            TypewriterFrame::Partial { text, .. } => revealed.push(text),
            TypewriterFrame::Complete => break,
        }
    }
    assert_eq!(revealed, vec!["o", "ok", "ok!"]);
    assert_eq!(player.visible_text(id, content), Some("ok!"));

    conductor.settle().await;
    assert!(project(&conductor.snapshot()).streaming_row().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_player_idle_until_synced() {
    let mut player = TypewriterPlayer::default();
    {
        let mut advance = tokio_test::task::spawn(player.advance());
        assert_pending!(advance.poll());
    }

    player.sync(&MessageId::new("m"), "");
    let mut advance = tokio_test::task::spawn(player.advance());
    let frame = assert_ready!(advance.poll());
    assert_eq!(frame, TypewriterFrame::Complete);
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_config_limits_input() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[chat]
default_agent = "pump-twin"
max_input_length = 5

[typewriter]
rate_ms = 10
"#
    )
    .unwrap();

    let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
    assert_eq!(config.typewriter_rate, Duration::from_millis(10));

    let backend = Arc::new(InMemoryBackend::new().with_conversation(conversation(), history()));
    let mut conductor = Conductor::new(backend.clone(), ConductorConfig::from(&config));
    conductor.handle_event(SurfaceEvent::bind(conversation().as_str()));
    conductor.settle().await;

    assert_eq!(conductor.send("too long"), SendOutcome::TooLong);
    assert_eq!(conductor.snapshot().messages, history());
    assert!(conductor.snapshot().error.is_some());

    assert_eq!(conductor.send("short"), SendOutcome::Accepted);
    conductor.settle().await;
    assert_eq!(backend.sent()[0].agent_id.as_ref().map(|a| a.as_str()), Some("pump-twin"));
}
