//! Regional shards, the global directory, and the channel between them.
//!
//! A [`GlobalDirectory`] maps an owner id to the name of the regional shard
//! that holds the owner's records. Resolving a record is a two-hop read:
//! the directory reads its own entry, then invokes `ReadAsset` on the named
//! [`RegionalShard`] through a [`ShardRegistry`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use crosschain_directory::{
//!     DirectoryEntry, GlobalDirectory, RegionalRecord, RegionalShard, ShardRegistry,
//! };
//! use crosschain_storage::MemoryBackend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let regional = Arc::new(RegionalShard::new(MemoryBackend::new()));
//!     regional
//!         .create(
//!             &RegionalRecord::builder()
//!                 .id("pc2")
//!                 .color("blue")
//!                 .size(5)
//!                 .owner("Alice")
//!                 .appraised_value(3000)
//!                 .build(),
//!         )
//!         .await?;
//!
//!     let registry =
//!         Arc::new(ShardRegistry::builder("mychannel").register("regionalA", regional).build()?);
//!     let directory =
//!         GlobalDirectory::builder().store(MemoryBackend::new()).registry(registry).build();
//!     directory.create(&DirectoryEntry::new("HP1", "regionalA")).await?;
//!
//!     let record = directory.resolve_by_owner("HP1", Some("pc2")).await?;
//!     assert_eq!(record.owner, "Alice");
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: enables the `testutil` module with a wired-up scenario
//!   fixture for use from other crates' tests.

#![deny(unsafe_code)]

pub mod channel;
pub mod directory;
mod documents;
pub mod error;
pub mod metrics;
pub mod record;
pub mod regional;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;

pub use channel::{DEFAULT_SCOPE, InvokeResponse, ShardEndpoint, ShardRegistry, Status};
pub use directory::{Entries, GlobalDirectory};
pub use documents::Documents;
pub use error::{DirectoryError, DirectoryResult, InvokeError};
pub use metrics::{Hop, HopMetrics};
pub use record::{DirectoryEntry, Document, RegionalRecord};
pub use regional::{Records, RegionalShard};
