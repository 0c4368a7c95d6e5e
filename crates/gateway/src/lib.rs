//! Routing front door for the cross-shard directory.
//!
//! An external request names an owner id and a record id. The front door
//! maps the owner id to a service name through a routing table read once
//! from a two-column CSV file, reads the record from that service over the
//! shard channel, and returns a JSON view of it.
//!
//! ```text
//! GET /readPP/?hospitalID=HP1&policyID=pc2
//!      │
//!      ├─ RoutingCache: HP1 → regionalCC1
//!      ├─ LedgerClient: regionalCC1 / ReadAsset [pc2]
//!      └─ PolicyView { hospitalID, service, ID, owner, authRoles, grant, metadata, dataLink }
//! ```
//!
//! The `crosschain-gateway` binary wires a [`Gateway`] from a JSON
//! [`GatewayConfig`] and serves it over HTTP.

#![deny(unsafe_code)]

pub mod app;
pub mod config;
pub mod error;
pub mod front_door;
pub mod http;
pub mod ledger;
pub mod routing;

pub use app::Gateway;
pub use config::{GatewayConfig, RoutingMode, ShardSpec};
pub use error::{ConfigError, GatewayError, GatewayResult};
pub use front_door::{FrontDoor, PolicyView};
pub use ledger::{ChannelLedgerClient, LedgerClient};
pub use routing::{CsvFileSource, RoutingCache, RoutingSource, RoutingTable};
