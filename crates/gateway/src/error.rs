//! Gateway error types.
//!
//! Every [`GatewayError`] collapses to a single HTTP 500 at the edge. The
//! typed error is logged first; the client sees only
//! [`GatewayError::public_message`].

use std::{path::PathBuf, time::Duration};

use crosschain_directory::{DirectoryError, InvokeError};
use crosschain_storage::BoxError;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised by the routing front door.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The routing table has no entry for the owner id.
    #[error("service name not found for owner id: {owner_id}")]
    RoutingNotFound {
        /// The unknown owner id.
        owner_id: String,
    },

    /// The routing source could not be read.
    #[error("failed to load routing table: {message}")]
    RoutingLoad {
        /// Description of the failure.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<BoxError>,
    },

    /// A routing entry names a service the channel does not serve.
    #[error("owner id {owner_id} routes to unregistered service {service}")]
    UnroutableService {
        /// Owner id of the offending entry.
        owner_id: String,
        /// The unregistered service.
        service: String,
    },

    /// The ledger query failed.
    #[error("query on {service} failed")]
    Ledger {
        /// The service that was queried.
        service: String,
        /// The channel error.
        #[source]
        source: InvokeError,
    },

    /// The ledger answered with a document that is not a policy.
    #[error("failed to parse document from {service}")]
    Parse {
        /// The service that answered.
        service: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The request did not finish within the configured timeout.
    #[error("request timed out after {timeout:?}")]
    Timeout {
        /// The configured timeout.
        timeout: Duration,
    },

    /// Seeding or wiring the shard services failed.
    #[error("failed to set up shard services")]
    Setup(#[from] DirectoryError),

    /// The shard registry could not be built.
    #[error("failed to build shard registry")]
    Registry(#[source] InvokeError),

    /// Configuration was invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    /// Creates a new `RoutingLoad` error with a source.
    #[must_use]
    pub fn routing_load(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RoutingLoad { message: message.into(), source: Some(std::sync::Arc::new(source)) }
    }

    /// The message shown to HTTP clients: the failed step plus its cause.
    pub fn public_message(&self) -> String {
        let step = match self {
            Self::RoutingNotFound { .. }
            | Self::RoutingLoad { .. }
            | Self::UnroutableService { .. } => "Failed to get service name",
            Self::Ledger { .. } | Self::Timeout { .. } => "Failed to query record",
            Self::Parse { .. } => "Failed to parse record",
            Self::Setup(_) | Self::Registry(_) | Self::Config(_) => "Failed to serve request",
        };
        format!("{step}: {}", error_chain(self))
    }
}

/// Joins an error and its sources with `": "`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Errors loading or validating [`GatewayConfig`](crate::config::GatewayConfig).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {}", path.display())]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// The I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config document is malformed.
    #[error("failed to parse config")]
    Parse(#[source] serde_json::Error),

    /// A field holds an unusable value.
    #[error("invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

impl ConfigError {
    /// Creates a new `Invalid` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid { message: message.into() }
    }
}
