use std::collections::HashMap;
use std::sync::Arc;

use redis::streams::StreamId;

use courtside_backend::config::settlement::SettlementSettings;
use courtside_backend::models::tennis_match::Round;
use courtside_backend::services::match_events::{Disposition, TRANSITION_FIELD};
use courtside_backend::services::{MatchEventConsumer, SettlementService};

mod common;
use common::fixtures::{completion, prediction};
use common::in_memory_store::InMemoryStore;

fn consumer(store: &Arc<InMemoryStore>) -> MatchEventConsumer {
    common::utils::init_tracing();
    // Nothing listens here, so settlement broadcasts fail fast and are only logged
    let redis_client = redis::Client::open("redis://127.0.0.1:1/").expect("Invalid redis url");
    MatchEventConsumer::new(
        Arc::new(redis_client),
        SettlementService::new(store.clone()),
        SettlementSettings::default(),
    )
}

fn stream_entry(id: &str, payload: &str) -> StreamId {
    let mut map = HashMap::new();
    map.insert(TRANSITION_FIELD.to_string(), redis::Value::Data(payload.as_bytes().to_vec()));
    StreamId { id: id.to_string(), map }
}

#[tokio::test]
async fn settled_entry_is_acknowledged() {
    let store = Arc::new(InMemoryStore::with_predictions(vec![prediction("u1", "m1", "p1")]));
    let payload = serde_json::to_string(&completion("m1", Round::SecondRound, "p1")).unwrap();

    let disposition = consumer(&store).handle_entry(&stream_entry("1-0", &payload)).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(store.user("u1").unwrap().points, 10);
}

#[tokio::test]
async fn malformed_entry_is_acknowledged_and_dropped() {
    let store = Arc::new(InMemoryStore::default());

    let disposition = consumer(&store).handle_entry(&stream_entry("1-0", "{\"before\":")).await;

    assert_eq!(disposition, Disposition::Ack);
    assert_eq!(store.commit_calls(), 0);
}

#[tokio::test]
async fn failed_settlement_stays_pending_until_it_succeeds() {
    let store = Arc::new(InMemoryStore::with_predictions(vec![prediction("u1", "m1", "p1")]));
    store.fail_next_commits(1);
    let consumer = consumer(&store);
    let entry = stream_entry("7-0", &serde_json::to_string(&completion("m1", Round::Final, "p1")).unwrap());

    assert_eq!(consumer.handle_entry(&entry).await, Disposition::Retry);
    assert!(store.user("u1").is_none());

    assert_eq!(consumer.handle_entry(&entry).await, Disposition::Ack);
    assert_eq!(store.user("u1").unwrap().points, 100);

    // A duplicate delivery after the ack is a harmless no-op
    assert_eq!(consumer.handle_entry(&entry).await, Disposition::Ack);
    assert_eq!(store.user("u1").unwrap().points, 100);
}

#[tokio::test]
async fn malformed_or_missing_round_still_settles_as_first_round() {
    let payloads = [
        r#"{"before":{"id":"m1","round":null,"completed":false},"after":{"id":"m1","round":null,"completed":true,"winner":"p1"}}"#,
        r#"{"before":{"id":"m1","round":3,"completed":false},"after":{"id":"m1","round":3,"completed":true,"winner":"p1"}}"#,
        r#"{"before":{"id":"m1","round":{},"completed":false},"after":{"id":"m1","round":{},"completed":true,"winner":"p1"}}"#,
        r#"{"before":{"id":"m1","completed":false},"after":{"id":"m1","completed":true,"winner":"p1"}}"#,
    ];

    for payload in payloads {
        let store = Arc::new(InMemoryStore::with_predictions(vec![prediction("u1", "m1", "p1")]));

        let disposition = consumer(&store).handle_entry(&stream_entry("3-0", payload)).await;

        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(store.commit_calls(), 1, "payload {} was not settled", payload);
        assert_eq!(store.user("u1").unwrap().points, 5);
    }
}
