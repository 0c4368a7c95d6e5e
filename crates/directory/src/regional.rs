//! Regional shard service.
//!
//! A [`RegionalShard`] owns the [`RegionalRecord`]s of one region, keyed by
//! their shard-local id. It serves CRUD and ownership transfer to local
//! callers, and `ReadAsset` / `AssetExists` / `GetAllAssets` to other shards
//! through the [`ShardEndpoint`] implementation.

use std::time::Instant;

use async_trait::async_trait;
use crosschain_storage::StorageBackend;

use crate::{
    channel::{InvokeResponse, OP_ASSET_EXISTS, OP_GET_ALL_ASSETS, OP_READ_ASSET, ShardEndpoint},
    documents::{DocumentStore, Documents},
    error::{DirectoryError, DirectoryResult},
    metrics::{Hop, HopMetrics},
    record::RegionalRecord,
};

/// Lazy iterator over a regional shard's records.
pub type Records = Documents<RegionalRecord>;

/// Record service for one regional shard.
pub struct RegionalShard<S> {
    docs: DocumentStore<S, RegionalRecord>,
    metrics: HopMetrics,
}

impl<S: StorageBackend> RegionalShard<S> {
    /// Creates a service over `store` with its own metrics collector.
    pub fn new(store: S) -> Self {
        Self::with_metrics(store, HopMetrics::new())
    }

    /// Creates a service that reports into a shared collector.
    pub fn with_metrics(store: S, metrics: HopMetrics) -> Self {
        Self { docs: DocumentStore::new(store), metrics }
    }

    pub fn metrics(&self) -> &HopMetrics {
        &self.metrics
    }

    /// The underlying shard store.
    pub fn backend(&self) -> &S {
        self.docs.backend()
    }

    /// Seeds `pc1..=pcN` with generated records.
    ///
    /// Existing ids are overwritten.
    #[tracing::instrument(skip(self))]
    pub async fn init_ledger(&self, count: usize) -> DirectoryResult<()> {
        for i in 1..=count {
            let record = RegionalRecord::builder()
                .id(format!("pc{i}"))
                .color("blue")
                .size(5)
                .owner("Owner")
                .appraised_value(3000)
                .build();
            let bytes = crate::documents::encode(&record)?;
            self.docs.backend().set(record.id.into_bytes(), bytes).await?;
        }
        tracing::info!(count, "Seeded regional shard");
        Ok(())
    }

    /// Returns `true` iff a record is stored under `id`.
    pub async fn exists(&self, id: &str) -> DirectoryResult<bool> {
        self.docs.exists(id).await
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::AlreadyExists`] if `record.id` is taken.
    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub async fn create(&self, record: &RegionalRecord) -> DirectoryResult<()> {
        self.docs.create(record).await
    }

    /// Reads one record.
    ///
    /// The elapsed lookup time is reported on every exit path, as a debug
    /// event and into the [`Hop::RegionalRead`] metrics.
    pub async fn read(&self, id: &str) -> DirectoryResult<RegionalRecord> {
        let start = Instant::now();
        let result = self.docs.read(id).await;
        let elapsed = start.elapsed();
        self.metrics.record(Hop::RegionalRead, elapsed, result.is_ok());
        tracing::debug!(
            id,
            elapsed_us = elapsed.as_micros() as u64,
            ok = result.is_ok(),
            "Regional read"
        );
        result
    }

    /// Overwrites an existing record.
    #[tracing::instrument(skip(self, record), fields(id = %record.id))]
    pub async fn update(&self, record: &RegionalRecord) -> DirectoryResult<()> {
        self.docs.update(record).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> DirectoryResult<()> {
        self.docs.delete(id).await
    }

    /// Sets the `owner` of a record, leaving every other field untouched.
    ///
    /// # Errors
    ///
    /// Fails as [`read`](Self::read) does, or with a store conflict if the
    /// record changed between the read and the write.
    #[tracing::instrument(skip(self))]
    pub async fn transfer_owner(
        &self,
        id: &str,
        new_owner: &str,
    ) -> DirectoryResult<RegionalRecord> {
        self.docs.modify(id, |record| record.owner = new_owner.to_owned()).await
    }

    /// Snapshot iterator over every record in key order.
    pub async fn list_all(&self) -> DirectoryResult<Records> {
        self.docs.list_all().await
    }
}

fn error_response(err: &DirectoryError) -> InvokeResponse {
    if err.is_not_found() {
        InvokeResponse::not_found(err.to_string())
    } else {
        InvokeResponse::error(err.to_string())
    }
}

#[async_trait]
impl<S: StorageBackend + 'static> ShardEndpoint for RegionalShard<S> {
    async fn handle(&self, op: &str, args: &[String]) -> InvokeResponse {
        match (op, args) {
            (OP_READ_ASSET, [id]) => match self.read(id).await {
                Ok(record) => json_response(&record),
                Err(e) => error_response(&e),
            },
            (OP_ASSET_EXISTS, [id]) => match self.exists(id).await {
                Ok(found) => InvokeResponse::ok(found.to_string()),
                Err(e) => error_response(&e),
            },
            (OP_GET_ALL_ASSETS, []) => {
                let records = match self.list_all().await {
                    Ok(records) => records.collect::<DirectoryResult<Vec<_>>>(),
                    Err(e) => Err(e),
                };
                match records {
                    Ok(records) => json_response(&records),
                    Err(e) => error_response(&e),
                }
            },
            (OP_READ_ASSET | OP_ASSET_EXISTS | OP_GET_ALL_ASSETS, _) => {
                InvokeResponse::error(format!("{op}: incorrect number of arguments"))
            },
            _ => InvokeResponse::error(format!("unknown operation: {op}")),
        }
    }

    async fn health_check(&self) -> DirectoryResult<()> {
        self.backend().health_check().await.map_err(DirectoryError::from)
    }
}

fn json_response<T: serde::Serialize>(value: &T) -> InvokeResponse {
    match serde_json::to_vec(value) {
        Ok(bytes) => InvokeResponse::ok(bytes),
        Err(e) => InvokeResponse::error(e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crosschain_storage::MemoryBackend;

    use super::*;
    use crate::channel::Status;

    #[tokio::test]
    async fn test_health_check_probes_store() {
        let backend = crosschain_storage::testutil::FailingBackend::new(MemoryBackend::new());
        let shard = RegionalShard::new(backend.clone());
        assert!(ShardEndpoint::health_check(&shard).await.is_ok());

        backend.set_failing(true);
        let result = ShardEndpoint::health_check(&shard).await;
        assert!(matches!(result, Err(DirectoryError::Store(_))));
    }

    fn shard() -> RegionalShard<MemoryBackend> {
        RegionalShard::new(MemoryBackend::new())
    }

    fn record(id: &str, owner: &str) -> RegionalRecord {
        RegionalRecord::builder().id(id).color("blue").size(5).owner(owner).appraised_value(3000).build()
    }

    #[tokio::test]
    async fn test_init_ledger_generates_records() {
        let shard = shard();
        shard.init_ledger(3).await.unwrap();
        let pc3 = shard.read("pc3").await.unwrap();
        assert_eq!(pc3, record("pc3", "Owner"));
        assert!(!shard.exists("pc4").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_reports_metrics_on_every_path() {
        let shard = shard();
        shard.create(&record("pc1", "Alice")).await.unwrap();
        shard.read("pc1").await.unwrap();
        shard.read("pc404").await.unwrap_err();

        let snapshot = shard.metrics().snapshot(Hop::RegionalRead);
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.errors, 1);
    }

    #[tokio::test]
    async fn test_endpoint_read_asset() {
        let shard = shard();
        shard.create(&record("pc2", "Alice")).await.unwrap();

        let response = shard.handle(OP_READ_ASSET, &["pc2".into()]).await;
        assert_eq!(response.status, Status::Ok);
        let decoded: RegionalRecord = serde_json::from_slice(&response.payload).unwrap();
        assert_eq!(decoded.owner, "Alice");

        let missing = shard.handle(OP_READ_ASSET, &["pc9".into()]).await;
        assert_eq!(missing.status, Status::NotFound);
        assert_eq!(missing.message, "the asset pc9 does not exist");
    }

    #[tokio::test]
    async fn test_endpoint_exists_and_list() {
        let shard = shard();
        shard.init_ledger(2).await.unwrap();

        let response = shard.handle(OP_ASSET_EXISTS, &["pc1".into()]).await;
        assert_eq!(&response.payload[..], b"true");

        let response = shard.handle(OP_GET_ALL_ASSETS, &[]).await;
        let all: Vec<RegionalRecord> = serde_json::from_slice(&response.payload).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_endpoint_rejects_bad_calls() {
        let shard = shard();
        assert_eq!(shard.handle("DeleteAsset", &["pc1".into()]).await.status, Status::Error);
        assert_eq!(shard.handle(OP_READ_ASSET, &[]).await.status, Status::Error);
    }
}
