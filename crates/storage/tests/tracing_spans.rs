//! Integration test verifying that `#[instrument]` annotations produce
//! spans for `MemoryBackend` operations.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use crosschain_storage::{MemoryBackend, Selector, StorageBackend};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_operation_creates_its_span() {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);

    let subscriber = tracing_subscriber::registry().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    let backend = MemoryBackend::new();
    backend.set(b"HP1".to_vec(), br#"{"hospitalID":"HP1"}"#.to_vec()).await.expect("set");
    let _ = backend.get(b"HP1").await;
    let _ = backend.compare_and_set(b"HP2", None, b"{}".to_vec()).await;
    let _ = backend.get_range::<std::ops::RangeFull>(..).await;
    let _ = backend.query(&Selector::new().eq("hospitalID", "HP1")).await;
    let _ = backend.health_check().await;
    backend.delete(b"HP1").await.expect("delete");

    let recorded = spans.lock().expect("lock poisoned");
    for name in ["set", "get", "compare_and_set", "get_range", "query", "health_check", "delete"] {
        assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
    }
}
