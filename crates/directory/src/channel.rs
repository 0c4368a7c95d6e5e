//! Cross-shard invocation channel.
//!
//! Shards never call each other by ad-hoc name lookup. Every endpoint is
//! registered once, at startup, in a [`ShardRegistry`] bound to a single
//! channel scope. A call names the target service, the operation and its
//! string arguments, and gets back a structured [`InvokeResponse`].
//!
//! ```text
//! GlobalDirectory ──invoke("regionalA", "ReadAsset", ["pc2"], "mychannel")──┐
//!                                                                          ▼
//!                        ShardRegistry { "regionalA" => RegionalShard, ... }
//!                                                                          │
//!                      InvokeResponse { status: 200, payload: {...} } ◄───┘
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    error::{DirectoryResult, InvokeError},
    record::RegionalRecord,
};

/// Channel scope used when none is configured.
pub const DEFAULT_SCOPE: &str = "mychannel";

/// Operation reading one record by id.
pub const OP_READ_ASSET: &str = "ReadAsset";
/// Operation checking whether a record exists.
pub const OP_ASSET_EXISTS: &str = "AssetExists";
/// Operation returning every record of a shard.
pub const OP_GET_ALL_ASSETS: &str = "GetAllAssets";

/// Outcome of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 200; the only success.
    Ok,
    /// 404.
    NotFound,
    /// 500.
    Error,
}

impl Status {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::Error => 500,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Structured response of a shard endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub status: Status,
    /// Response body; a JSON document on success.
    pub payload: Bytes,
    /// Human-readable description; empty on success.
    pub message: String,
}

impl InvokeResponse {
    /// A successful response carrying `payload`.
    #[must_use]
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self { status: Status::Ok, payload: payload.into(), message: String::new() }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: Status::NotFound, payload: Bytes::new(), message: message.into() }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self { status: Status::Error, payload: Bytes::new(), message: message.into() }
    }
}

/// A shard service reachable through the channel.
#[async_trait]
pub trait ShardEndpoint: Send + Sync {
    /// Handles one operation. Unknown operations answer [`Status::Error`].
    async fn handle(&self, op: &str, args: &[String]) -> InvokeResponse;

    /// Probes the store behind the endpoint.
    async fn health_check(&self) -> DirectoryResult<()> {
        Ok(())
    }
}

/// Named shard endpoints for one channel scope, fixed at construction.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use crosschain_directory::{RegionalShard, ShardRegistry};
/// use crosschain_storage::MemoryBackend;
///
/// let registry = ShardRegistry::builder("mychannel")
///     .register("regionalA", Arc::new(RegionalShard::new(MemoryBackend::new())))
///     .build()
///     .unwrap();
/// assert!(registry.contains("regionalA"));
/// ```
pub struct ShardRegistry {
    scope: String,
    endpoints: BTreeMap<String, Arc<dyn ShardEndpoint>>,
}

impl ShardRegistry {
    /// Starts a registry for `scope`.
    pub fn builder(scope: impl Into<String>) -> ShardRegistryBuilder {
        ShardRegistryBuilder { scope: scope.into(), endpoints: Vec::new() }
    }

    /// The channel scope this registry serves.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn contains(&self, service: &str) -> bool {
        self.endpoints.contains_key(service)
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// Probes every endpoint and returns the services that failed, sorted
    /// by name. An empty list means every store answered.
    pub async fn health_check(&self) -> Vec<(&str, crate::error::DirectoryError)> {
        let mut failed = Vec::new();
        for (service, endpoint) in &self.endpoints {
            if let Err(e) = endpoint.health_check().await {
                tracing::warn!(service = %service, error = %e, "Health check failed");
                failed.push((service.as_str(), e));
            }
        }
        failed
    }

    /// Invokes `op` on `service`.
    ///
    /// Returns the response only when its status is [`Status::Ok`]; every
    /// other outcome is an [`InvokeError`]. The call is awaited inline and
    /// never retried.
    #[tracing::instrument(skip(self, args), fields(args = args.len()))]
    pub async fn invoke(
        &self,
        service: &str,
        op: &str,
        args: &[String],
        scope: &str,
    ) -> Result<InvokeResponse, InvokeError> {
        if scope != self.scope {
            return Err(InvokeError::ScopeMismatch {
                expected: self.scope.clone(),
                actual: scope.to_owned(),
            });
        }
        let endpoint =
            self.endpoints.get(service).ok_or_else(|| InvokeError::unknown_service(service))?;

        let response = endpoint.handle(op, args).await;
        if !response.status.is_ok() {
            tracing::debug!(status = %response.status, message = %response.message, "Invocation failed");
            return Err(InvokeError::Status {
                service: service.to_owned(),
                op: op.to_owned(),
                status: response.status,
                message: response.message,
            });
        }
        Ok(response)
    }

    /// Invokes `ReadAsset` on `service` and decodes the payload.
    pub async fn invoke_record(
        &self,
        service: &str,
        record_id: &str,
        scope: &str,
    ) -> Result<RegionalRecord, InvokeError> {
        let response = self.invoke(service, OP_READ_ASSET, &[record_id.to_owned()], scope).await?;
        serde_json::from_slice(&response.payload)
            .map_err(|source| InvokeError::Decode { service: service.to_owned(), source })
    }
}

impl fmt::Debug for ShardRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardRegistry")
            .field("scope", &self.scope)
            .field("services", &self.endpoints.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ShardRegistry`].
pub struct ShardRegistryBuilder {
    scope: String,
    endpoints: Vec<(String, Arc<dyn ShardEndpoint>)>,
}

impl ShardRegistryBuilder {
    /// Adds an endpoint under `service`.
    #[must_use]
    pub fn register(mut self, service: impl Into<String>, endpoint: Arc<dyn ShardEndpoint>) -> Self {
        self.endpoints.push((service.into(), endpoint));
        self
    }

    /// Finishes the registry.
    ///
    /// # Errors
    ///
    /// [`InvokeError::DuplicateService`] if a name was registered twice.
    pub fn build(self) -> Result<ShardRegistry, InvokeError> {
        let mut endpoints = BTreeMap::new();
        for (service, endpoint) in self.endpoints {
            if endpoints.contains_key(&service) {
                return Err(InvokeError::DuplicateService { service });
            }
            endpoints.insert(service, endpoint);
        }
        Ok(ShardRegistry { scope: self.scope, endpoints })
    }
}
