//! Shard store abstraction for the cross-shard directory.
//!
//! Every shard (the global directory and each regional shard) keeps its
//! state in a ledger runtime that this workspace does not implement. This
//! crate fixes the interface to that runtime, the [`StorageBackend`] trait,
//! and ships an in-memory implementation used by tests and the demo gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Front Door (gateway)                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │        GlobalDirectory ──invoke──► RegionalShard            │
//! │             (crosschain-directory service layer)            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   crosschain-storage                        │
//! │                 StorageBackend trait                        │
//! │   (get, set, compare_and_set, delete, get_range, query)     │
//! ├──────────────┬──────────────────────────────────────────────┤
//! │ MemoryBackend│          ledger runtime (external)           │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use crosschain_storage::{MemoryBackend, Selector, StorageBackend};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MemoryBackend::new();
//!
//!     backend.set(b"HP1".to_vec(), br#"{"hospitalID":"HP1"}"#.to_vec()).await?;
//!     assert!(backend.exists(b"HP1").await?);
//!
//!     let hits = backend.query(&Selector::new().eq("hospitalID", "HP1")).await?;
//!     assert_eq!(hits.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: enables the `testutil` module (failure-injecting backend, fixtures, assertion
//!   macros) for use from other crates' tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod error;
pub mod memory;
pub mod selector;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

pub use backend::StorageBackend;
pub use error::{BoxError, StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use selector::Selector;
pub use types::KeyValue;
