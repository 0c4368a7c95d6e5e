//! Shared fixtures for directory and gateway tests.
//!
//! Feature-gated behind `testutil`:
//!
//! ```toml
//! [dev-dependencies]
//! crosschain-directory = { path = "../directory", features = ["testutil"] }
//! ```

use std::sync::Arc;

use crosschain_storage::MemoryBackend;

use crate::{
    channel::{DEFAULT_SCOPE, ShardRegistry},
    directory::GlobalDirectory,
    metrics::HopMetrics,
    record::{DirectoryEntry, RegionalRecord},
    regional::RegionalShard,
};

/// Builds a record with the generated defaults and the given id and owner.
#[must_use]
pub fn record(id: &str, owner: &str) -> RegionalRecord {
    RegionalRecord::builder().id(id).color("blue").size(5).owner(owner).appraised_value(3000).build()
}

/// One regional shard wired behind a directory.
///
/// - `regionalA` holds `pc1` (owner `Owner`) and `pc2` (owner `Alice`).
/// - The directory maps `HP1 → regionalA` with `policyID = pc2`.
///
/// Every service reports into [`Scenario::metrics`].
pub struct Scenario {
    pub regional: Arc<RegionalShard<MemoryBackend>>,
    pub registry: Arc<ShardRegistry>,
    pub directory: GlobalDirectory<MemoryBackend>,
    pub metrics: HopMetrics,
}

impl Scenario {
    /// Builds and seeds the scenario.
    ///
    /// # Panics
    ///
    /// Panics if seeding fails (should not happen with `MemoryBackend`).
    pub async fn new() -> Self {
        let metrics = HopMetrics::new();
        let regional =
            Arc::new(RegionalShard::with_metrics(MemoryBackend::new(), metrics.clone()));
        regional.create(&record("pc1", "Owner")).await.expect("seed pc1");
        regional.create(&record("pc2", "Alice")).await.expect("seed pc2");

        let registry = Arc::new(
            ShardRegistry::builder(DEFAULT_SCOPE)
                .register("regionalA", Arc::clone(&regional) as _)
                .build()
                .expect("registry"),
        );
        let directory = GlobalDirectory::builder()
            .store(MemoryBackend::new())
            .registry(Arc::clone(&registry))
            .metrics(metrics.clone())
            .build();
        let entry = DirectoryEntry::builder()
            .owner_id("HP1")
            .shard("regionalA")
            .record_id("pc2")
            .owner("Alice")
            .build();
        directory.create(&entry).await.expect("seed HP1");

        Self { regional, registry, directory, metrics }
    }
}
