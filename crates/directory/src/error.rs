//! Error types for the shard services and the invocation channel.
//!
//! [`DirectoryError`] is returned by every service operation. Cross-shard
//! failures are wrapped as [`DirectoryError::CrossShard`] with the
//! downstream [`InvokeError`] preserved as the source, so the full chain
//! (directory → channel → regional shard) shows up in structured logs.

use crosschain_storage::StorageError;
use thiserror::Error;

use crate::{channel::Status, metrics::Hop};

/// Result type alias for service operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors returned by [`RegionalShard`](crate::RegionalShard) and
/// [`GlobalDirectory`](crate::GlobalDirectory) operations.
///
/// # Non-exhaustive
///
/// New variants may be added without a semver-breaking change. Downstream
/// match expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DirectoryError {
    /// No document is stored under the key.
    #[error("the asset {key} does not exist")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// A document is already stored under the key.
    #[error("the asset {key} already exists")]
    AlreadyExists {
        /// The conflicting key.
        key: String,
    },

    /// Stored bytes did not decode into the expected document shape.
    #[error("failed to decode document {key}")]
    Decode {
        /// Key of the undecodable document.
        key: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The cross-shard hop of a resolution failed.
    #[error("{hop} read of {key} on {service} failed")]
    CrossShard {
        /// The hop that failed.
        hop: Hop,
        /// Shard the read was routed to.
        service: String,
        /// Record id that was requested.
        key: String,
        /// The downstream failure.
        #[source]
        source: InvokeError,
    },

    /// The shard store failed.
    #[error(transparent)]
    Store(#[from] StorageError),
}

impl DirectoryError {
    /// Creates a new `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates a new `AlreadyExists` error for the given key.
    #[must_use]
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists { key: key.into() }
    }

    /// Creates a new `CrossShard` error.
    #[must_use]
    pub fn cross_shard(
        service: impl Into<String>,
        key: impl Into<String>,
        source: InvokeError,
    ) -> Self {
        Self::CrossShard { hop: Hop::CrossShard, service: service.into(), key: key.into(), source }
    }

    /// Returns `true` for [`DirectoryError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors from the cross-shard invocation channel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InvokeError {
    /// No endpoint is registered under the service name.
    #[error("unknown service: {service}")]
    UnknownService {
        /// The requested service name.
        service: String,
    },

    /// A second endpoint was registered under an existing name.
    #[error("service registered twice: {service}")]
    DuplicateService {
        /// The duplicated service name.
        service: String,
    },

    /// The caller's scope id does not match the registry's channel.
    #[error("scope mismatch: registry serves {expected}, caller asked for {actual}")]
    ScopeMismatch {
        /// The registry's scope.
        expected: String,
        /// The scope the caller passed.
        actual: String,
    },

    /// The endpoint answered with a non-OK status.
    #[error("{service}/{op} returned {status}: {message}")]
    Status {
        /// The invoked service.
        service: String,
        /// The invoked operation.
        op: String,
        /// The response status.
        status: Status,
        /// The response message.
        message: String,
    },

    /// The endpoint answered OK but the payload did not decode.
    #[error("undecodable payload from {service}")]
    Decode {
        /// The invoked service.
        service: String,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl InvokeError {
    /// Creates a new `UnknownService` error.
    #[must_use]
    pub fn unknown_service(service: impl Into<String>) -> Self {
        Self::UnknownService { service: service.into() }
    }

    /// Returns the response status for [`InvokeError::Status`], if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_messages_carry_key() {
        assert_eq!(DirectoryError::not_found("pc7").to_string(), "the asset pc7 does not exist");
        assert_eq!(
            DirectoryError::already_exists("HP1").to_string(),
            "the asset HP1 already exists"
        );
    }

    #[test]
    fn test_cross_shard_preserves_source_chain() {
        let err =
            DirectoryError::cross_shard("regionalX", "pc2", InvokeError::unknown_service("regionalX"));
        assert!(err.to_string().contains("regionalX"));
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("unknown service: regionalX"));
    }

    #[test]
    fn test_store_error_is_transparent() {
        let err: DirectoryError = StorageError::connection("peer down").into();
        assert_eq!(err.to_string(), "Connection error: peer down");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_invoke_status_accessor() {
        let err = InvokeError::Status {
            service: "regionalA".into(),
            op: "ReadAsset".into(),
            status: Status::NotFound,
            message: "missing".into(),
        };
        assert_eq!(err.status(), Some(Status::NotFound));
        assert_eq!(InvokeError::unknown_service("x").status(), None);
    }
}
