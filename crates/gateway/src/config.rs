//! Gateway configuration.
//!
//! [`GatewayConfig`] describes everything the gateway process wires up at
//! startup: the listen address, the routing table source and how it is
//! loaded, the channel scope, and the shard services with their seed data.
//!
//! # Example
//!
//! ```json
//! {
//!   "listen_addr": "0.0.0.0:8080",
//!   "routing_table": "config/routing.csv",
//!   "routing_mode": "eager",
//!   "request_timeout": "5s",
//!   "shards": [{ "name": "regionalCC1", "seed": 5 }],
//!   "directory": [{ "hospitalID": "HP1", "regionalCCName": "regionalCC1" }]
//! }
//! ```

use std::{
    collections::HashSet,
    net::{Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use crosschain_directory::{DEFAULT_SCOPE, DirectoryEntry};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default request timeout (30 seconds).
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default port of the HTTP listener.
const DEFAULT_PORT: u16 = 8080;

/// Service name under which the global directory is exposed.
const DEFAULT_DIRECTORY_SERVICE: &str = "globalcc";

/// When the routing table is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Read at startup; a failed read stops the process.
    #[default]
    Eager,
    /// Read on the first lookup; a failed read leaves the table empty.
    Lazy,
}

/// A regional shard served by this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct ShardSpec {
    /// Service name in the shard registry.
    #[builder(into)]
    pub name: String,

    /// Number of generated records (`pc1..pcN`) to seed.
    #[serde(default)]
    #[builder(default)]
    pub seed: usize,
}

/// Configuration for the gateway process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_addr")]
    pub(crate) listen_addr: SocketAddr,

    /// Two-column CSV mapping owner ids to service names.
    pub(crate) routing_table: PathBuf,

    #[serde(default)]
    pub(crate) routing_mode: RoutingMode,

    /// Channel scope shared by every registered shard.
    #[serde(default = "default_scope")]
    pub(crate) scope: String,

    /// Per-request timeout applied by the HTTP layer.
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub(crate) request_timeout: Duration,

    #[serde(default = "default_directory_service")]
    pub(crate) directory_service: String,

    #[serde(default)]
    pub(crate) shards: Vec<ShardSpec>,

    /// Entries seeded into the global directory.
    #[serde(default)]
    pub(crate) directory: Vec<DirectoryEntry>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT))
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_owned()
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_directory_service() -> String {
    DEFAULT_DIRECTORY_SERVICE.to_owned()
}

#[bon::bon]
impl GatewayConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if:
    /// - the scope or directory service name is empty
    /// - the request timeout is zero
    /// - two shards share a name, or a shard uses the directory's name
    #[builder]
    pub fn new(
        #[builder(default = default_listen_addr())] listen_addr: SocketAddr,
        #[builder(into)] routing_table: PathBuf,
        #[builder(default)] routing_mode: RoutingMode,
        #[builder(into, default = default_scope())] scope: String,
        #[builder(default = DEFAULT_REQUEST_TIMEOUT)] request_timeout: Duration,
        #[builder(into, default = default_directory_service())] directory_service: String,
        #[builder(default)] shards: Vec<ShardSpec>,
        #[builder(default)] directory: Vec<DirectoryEntry>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            listen_addr,
            routing_table,
            routing_mode,
            scope,
            request_timeout,
            directory_service,
            shards,
            directory,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    ///
    /// A relative `routing_table` is resolved against the config file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let mut config = Self::from_json(&raw)?;
        if config.routing_table.is_relative()
            && let Some(dir) = path.parent()
        {
            config.routing_table = dir.join(&config.routing_table);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scope.is_empty() {
            return Err(ConfigError::invalid("scope cannot be empty"));
        }
        if self.directory_service.is_empty() {
            return Err(ConfigError::invalid("directory_service cannot be empty"));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid("request_timeout must be greater than zero"));
        }
        let mut names = HashSet::new();
        for shard in &self.shards {
            if shard.name.is_empty() {
                return Err(ConfigError::invalid("shard name cannot be empty"));
            }
            if shard.name == self.directory_service {
                return Err(ConfigError::invalid(format!(
                    "shard {} collides with the directory service name",
                    shard.name
                )));
            }
            if !names.insert(shard.name.as_str()) {
                return Err(ConfigError::invalid(format!("duplicate shard: {}", shard.name)));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    #[must_use]
    pub fn routing_table(&self) -> &Path {
        &self.routing_table
    }

    #[must_use]
    pub fn routing_mode(&self) -> RoutingMode {
        self.routing_mode
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn directory_service(&self) -> &str {
        &self.directory_service
    }

    #[must_use]
    pub fn shards(&self) -> &[ShardSpec] {
        &self.shards
    }

    #[must_use]
    pub fn directory(&self) -> &[DirectoryEntry] {
        &self.directory
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = GatewayConfig::from_json(r#"{"routing_table":"routes.csv"}"#).unwrap();
        assert_eq!(config.listen_addr().port(), 8080);
        assert_eq!(config.routing_mode(), RoutingMode::Eager);
        assert_eq!(config.scope(), "mychannel");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.directory_service(), "globalcc");
        assert!(config.shards().is_empty());
    }

    #[test]
    fn test_full_json() {
        let config = GatewayConfig::from_json(
            r#"{
                "listen_addr": "127.0.0.1:9000",
                "routing_table": "routes.csv",
                "routing_mode": "lazy",
                "request_timeout": "250ms",
                "shards": [{"name": "regionalCC1", "seed": 3}, {"name": "regionalCC2"}],
                "directory": [{"hospitalID": "HP1", "regionalCCName": "regionalCC1", "policyID": "pc2"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.routing_mode(), RoutingMode::Lazy);
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.shards()[1], ShardSpec::builder().name("regionalCC2").build());
        assert_eq!(config.directory()[0].record_id.as_deref(), Some("pc2"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = GatewayConfig::from_json(r#"{"routing_table":"r.csv","routes":"x"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[rstest]
    #[case::empty_scope(GatewayConfig::builder().routing_table("r.csv").scope("").build())]
    #[case::zero_timeout(
        GatewayConfig::builder().routing_table("r.csv").request_timeout(Duration::ZERO).build()
    )]
    #[case::duplicate_shard(
        GatewayConfig::builder()
            .routing_table("r.csv")
            .shards(vec![ShardSpec::builder().name("a").build(), ShardSpec::builder().name("a").build()])
            .build()
    )]
    #[case::shard_named_like_directory(
        GatewayConfig::builder()
            .routing_table("r.csv")
            .shards(vec![ShardSpec::builder().name("globalcc").build()])
            .build()
    )]
    fn test_invalid_configs(#[case] result: Result<GatewayConfig, ConfigError>) {
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_from_file_resolves_routing_table_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(&path, r#"{"routing_table":"routes.csv"}"#).unwrap();

        let config = GatewayConfig::from_file(&path).unwrap();
        assert_eq!(config.routing_table(), dir.path().join("routes.csv"));
    }

    #[test]
    fn test_from_file_missing() {
        let err = GatewayConfig::from_file("/nonexistent/gateway.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
