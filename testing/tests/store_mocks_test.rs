//! Behaviour of the in-memory store capabilities.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use futures::StreamExt;
use matchtag_core::document::{Document, DocumentError, DocumentStore};
use matchtag_core::table::EventTable;
use matchtag_testing::{InMemoryDocumentStore, InMemoryEventTable};
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn merge_writes_replace_only_the_keys_sent() {
    let store = InMemoryDocumentStore::new();
    store
        .set_merge("coach", doc(json!({ "players": [1], "tags": [1, 2] })))
        .await
        .unwrap();
    store
        .set_merge("coach", doc(json!({ "tags": [3] })))
        .await
        .unwrap();

    let stored = store.get("coach").await.unwrap().unwrap();
    assert_eq!(stored["players"], json!([1]));
    assert_eq!(stored["tags"], json!([3]));
    assert_eq!(store.write_count(), 2);
}

#[tokio::test]
async fn subscribers_see_current_document_then_updates() {
    let store = InMemoryDocumentStore::new();
    store.insert("coach", doc(json!({ "tags": [] })));

    let mut updates = store.subscribe("coach").await.unwrap();
    assert_eq!(store.subscriber_count("coach"), 1);

    let first = updates.next().await.unwrap().unwrap();
    assert_eq!(first["tags"], json!([]));

    store
        .set_merge("coach", doc(json!({ "tags": ["t1"] })))
        .await
        .unwrap();
    let second = updates.next().await.unwrap().unwrap();
    assert_eq!(second["tags"], json!(["t1"]));

    store.push_delivery_error("coach", "network blip");
    let failed = updates.next().await.unwrap();
    assert!(matches!(failed, Err(DocumentError::Unavailable(_))));
}

#[tokio::test]
async fn injected_failures_are_consumed_in_order() {
    let store = InMemoryDocumentStore::new();
    store.fail_next_gets(1);
    store.fail_next_sets(1);

    assert!(store.get("coach").await.is_err());
    assert!(store.get("coach").await.unwrap().is_none());

    assert!(store.set_merge("coach", Document::new()).await.is_err());
    assert!(store.set_merge("coach", Document::new()).await.is_ok());
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn table_pages_until_short_page() {
    let table = InMemoryEventTable::new();
    table.seed("tags", (0..5).map(|i| json!({ "id": format!("t{i}") })));

    let first = table.fetch_page("tags", 0, 2).await.unwrap();
    let last = table.fetch_page("tags", 4, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(last.len(), 1);
    assert_eq!(table.page_requests(), 2);

    assert!(table.delete("tags", "t0").await.unwrap());
    assert!(!table.delete("tags", "t0").await.unwrap());
    assert_eq!(table.len("tags"), 4);
}
