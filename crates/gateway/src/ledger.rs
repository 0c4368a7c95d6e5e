//! Ledger query client used by the front door.
//!
//! The front door never touches a shard store directly. It asks a
//! [`LedgerClient`] to run a read-only operation on a named service and
//! gets back the raw response payload.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use crosschain_directory::{InvokeError, ShardRegistry};

/// Read-only access to shard services.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Runs `op` with `args` on `service` and returns the response payload.
    async fn query(&self, service: &str, op: &str, args: &[String]) -> Result<Bytes, InvokeError>;
}

/// [`LedgerClient`] over an in-process [`ShardRegistry`].
///
/// Every call uses the registry's own scope.
#[derive(Debug, Clone)]
pub struct ChannelLedgerClient {
    registry: Arc<ShardRegistry>,
}

impl ChannelLedgerClient {
    pub fn new(registry: Arc<ShardRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }
}

#[async_trait]
impl LedgerClient for ChannelLedgerClient {
    async fn query(&self, service: &str, op: &str, args: &[String]) -> Result<Bytes, InvokeError> {
        let response = self.registry.invoke(service, op, args, self.registry.scope()).await?;
        Ok(response.payload)
    }
}
