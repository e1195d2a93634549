//! # Outbox Tests
//!
//! These tests verify the store-and-forward semantics of the message store:
//! a message stays eligible for sending until a success response exists, and
//! delivery receipts are never lost even when the message row is missing.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use audio_sentinel::data::{Message, Response, ResponseStatus};
use audio_sentinel::outbox::SqliteMessageStore;

/// Helper to create an outbox backed by a temporary database file
async fn create_test_outbox() -> (SqliteMessageStore, tempfile::TempDir) {
    let (pool, guard) = audio_sentinel::db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    audio_sentinel::db::init_outbox_schema(&pool).await.unwrap();
    (SqliteMessageStore::new(pool), guard)
}

/// Helper to build a message with a fixed creation time
fn message_at(content: &str, minute: u32) -> Message {
    Message {
        id: Uuid::new_v4(),
        content: content.into(),
        created_on: Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap(),
    }
}

#[tokio::test]
async fn message_is_unsent_until_success_response() {
    let (outbox, _guard) = create_test_outbox().await;

    let message = message_at("{\"a\":1}", 0);
    outbox.store_message(&message).await.unwrap();

    let unsent = outbox.get_unsent_messages().await.unwrap();
    assert_eq!(unsent.len(), 1);
    assert_eq!(unsent[0], message);

    let response = Response::new(message.clone(), ResponseStatus::Success, Some("ok".into()));
    outbox.store_response(&response).await.unwrap();

    assert!(outbox.get_unsent_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_responses_keep_message_eligible() {
    let (outbox, _guard) = create_test_outbox().await;

    let message = message_at("{\"a\":1}", 0);
    outbox.store_message(&message).await.unwrap();

    for status in [
        ResponseStatus::Failed,
        ResponseStatus::Error,
        ResponseStatus::Timeout,
    ] {
        let response = Response::new(message.clone(), status, None);
        outbox.store_response(&response).await.unwrap();
        let unsent = outbox.get_unsent_messages().await.unwrap();
        assert_eq!(unsent.len(), 1, "still unsent after {status:?}");
    }

    let response = Response::new(message.clone(), ResponseStatus::Success, None);
    outbox.store_response(&response).await.unwrap();
    assert!(outbox.get_unsent_messages().await.unwrap().is_empty());

    let responses = outbox.get_responses(message.id).await.unwrap();
    assert_eq!(responses.len(), 4);
}

#[tokio::test]
async fn unsent_messages_come_back_oldest_first() {
    let (outbox, _guard) = create_test_outbox().await;

    let newer = message_at("newer", 30);
    let older = message_at("older", 10);
    outbox.store_message(&newer).await.unwrap();
    outbox.store_message(&older).await.unwrap();

    let unsent = outbox.get_unsent_messages().await.unwrap();
    assert_eq!(unsent[0].content, "older");
    assert_eq!(unsent[1].content, "newer");
}

#[tokio::test]
async fn storing_a_message_twice_is_a_noop() {
    let (outbox, _guard) = create_test_outbox().await;

    let message = message_at("once", 0);
    outbox.store_message(&message).await.unwrap();
    outbox.store_message(&message).await.unwrap();

    assert_eq!(outbox.get_unsent_messages().await.unwrap().len(), 1);
}

#[tokio::test]
async fn response_for_unknown_message_creates_the_row() {
    let (outbox, _guard) = create_test_outbox().await;

    // Send finished before the enqueue was ever stored.
    let message = message_at("raced", 0);
    let response = Response::new(message.clone(), ResponseStatus::Failed, Some("tcp reset".into()));
    outbox.store_response(&response).await.unwrap();

    // The receipt survived and the message is eligible for retry.
    let unsent = outbox.get_unsent_messages().await.unwrap();
    assert_eq!(unsent.len(), 1);
    assert_eq!(unsent[0].id, message.id);

    let responses = outbox.get_responses(message.id).await.unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].0, ResponseStatus::Failed);
    assert_eq!(responses[0].1.as_deref(), Some("tcp reset"));
}
