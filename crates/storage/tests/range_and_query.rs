//! Range scan and rich query edge cases for `MemoryBackend`.
//!
//! Covers boundary inclusion/exclusion, inverted and degenerate ranges,
//! and selector matching against the kinds of documents a shard holds.

#![allow(clippy::expect_used)]

use std::ops::Bound;

use crosschain_storage::{MemoryBackend, Selector, StorageBackend};

/// Keys `pc1`..`pc5`, each a regional-record-shaped document.
async fn populated_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    for (i, owner) in ["Owner", "Alice", "Owner", "Bob", "Alice"].iter().enumerate() {
        let id = format!("pc{}", i + 1);
        let doc = format!(
            r#"{{"ID":"{id}","color":"blue","size":5,"owner":"{owner}","appraisedValue":3000}}"#
        );
        backend.set(id.into_bytes(), doc.into_bytes()).await.expect("set");
    }
    backend
}

fn keys(results: &[crosschain_storage::KeyValue]) -> Vec<&str> {
    results.iter().filter_map(|kv| kv.key_str()).collect()
}

// ============================================================================
// Ranges
// ============================================================================

#[tokio::test]
async fn test_half_open_range() {
    let backend = populated_backend().await;
    let results = backend.get_range(b"pc2".to_vec()..b"pc4".to_vec()).await.expect("range");
    assert_eq!(keys(&results), ["pc2", "pc3"]);
}

#[tokio::test]
async fn test_inclusive_single_key() {
    let backend = populated_backend().await;
    let results = backend.get_range(b"pc3".to_vec()..=b"pc3".to_vec()).await.expect("range");
    assert_eq!(keys(&results), ["pc3"]);
}

#[tokio::test]
async fn test_excluded_bounds() {
    let backend = populated_backend().await;
    let results = backend
        .get_range((Bound::Excluded(b"pc1".to_vec()), Bound::Excluded(b"pc5".to_vec())))
        .await
        .expect("range");
    assert_eq!(keys(&results), ["pc2", "pc3", "pc4"]);
}

/// `BTreeMap::range` panics on these; the backend answers with nothing.
#[tokio::test]
async fn test_inverted_and_degenerate_ranges_are_empty() {
    let backend = populated_backend().await;

    let inverted = backend.get_range(b"pc4".to_vec()..b"pc2".to_vec()).await.expect("inverted");
    assert!(inverted.is_empty());

    let both_excluded = backend
        .get_range((Bound::Excluded(b"pc3".to_vec()), Bound::Excluded(b"pc3".to_vec())))
        .await
        .expect("degenerate");
    assert!(both_excluded.is_empty());

    let inclusive_inverted =
        backend.get_range(b"pc5".to_vec()..=b"pc1".to_vec()).await.expect("inverted inclusive");
    assert!(inclusive_inverted.is_empty());
}

#[tokio::test]
async fn test_unbounded_scan_on_empty_backend() {
    let backend = MemoryBackend::new();
    let results = backend.get_range::<std::ops::RangeFull>(..).await.expect("scan");
    assert!(results.is_empty());
}

// ============================================================================
// Rich queries
// ============================================================================

#[tokio::test]
async fn test_query_single_field_in_key_order() {
    let backend = populated_backend().await;
    let results = backend.query(&Selector::new().eq("owner", "Alice")).await.expect("query");
    assert_eq!(keys(&results), ["pc2", "pc5"]);
}

#[tokio::test]
async fn test_query_all_fields_must_match() {
    let backend = populated_backend().await;
    let selector = Selector::new().eq("owner", "Alice").eq("ID", "pc5");
    let results = backend.query(&selector).await.expect("query");
    assert_eq!(keys(&results), ["pc5"]);
}

#[tokio::test]
async fn test_query_compares_json_types() {
    let backend = populated_backend().await;
    let as_number = backend.query(&Selector::new().eq("size", 5)).await.expect("query");
    assert_eq!(as_number.len(), 5);
    let as_string = backend.query(&Selector::new().eq("size", "5")).await.expect("query");
    assert!(as_string.is_empty());
}

#[tokio::test]
async fn test_query_skips_non_json_values() {
    let backend = populated_backend().await;
    backend.set(b"raw".to_vec(), b"not a document".to_vec()).await.expect("set");
    let results = backend.query(&Selector::new()).await.expect("query");
    assert_eq!(results.len(), 5);
}

#[tokio::test]
async fn test_query_by_owner() {
    let backend = populated_backend().await;
    let results = backend.query(&Selector::new().eq("owner", "Bob")).await.expect("query");
    assert_eq!(keys(&results), ["pc4"]);
}
