//! Routing front door.
//!
//! The front door is the external entry point. It turns an owner id into a
//! service name through the [`RoutingCache`], reads the requested document
//! from that service through a [`LedgerClient`], and re-exposes a fixed
//! subset of its fields.
//!
//! A regional service answers `ReadAsset [record_id]`. When the owner id
//! routes to the global directory, the front door asks it for
//! `ReadRegionalAsset [record_id, owner_id]` instead, and the directory
//! resolves the record on the owner's regional shard.

use std::sync::Arc;

use crosschain_directory::{
    ShardRegistry, channel::OP_READ_ASSET, directory::OP_READ_REGIONAL_ASSET,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{GatewayError, GatewayResult},
    ledger::LedgerClient,
    routing::RoutingCache,
};

/// The document shape the front door reads from a service.
///
/// Missing fields decode to their empty value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PolicyDocument {
    #[serde(rename = "ID")]
    id: String,
    owner: String,
    #[serde(rename = "authRoles")]
    auth_roles: Vec<String>,
    grant: String,
    metadata: String,
}

/// What the front door returns for a forwarded query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    #[serde(rename = "hospitalID")]
    pub owner_id: String,
    /// The service the owner id routed to.
    pub service: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub owner: String,
    #[serde(rename = "authRoles")]
    pub auth_roles: Vec<String>,
    pub grant: String,
    pub metadata: String,
    /// `metadata` when it is an http(s) URL.
    #[serde(rename = "dataLink", skip_serializing_if = "Option::is_none")]
    pub data_link: Option<String>,
}

fn data_link(metadata: &str) -> Option<String> {
    let lower = metadata.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")).then(|| metadata.to_owned())
}

/// External entry point: owner id routing plus ledger forwarding.
pub struct FrontDoor {
    routes: RoutingCache,
    ledger: Arc<dyn LedgerClient>,
    directory_service: Option<String>,
}

impl FrontDoor {
    pub fn new(routes: RoutingCache, ledger: Arc<dyn LedgerClient>) -> Self {
        Self { routes, ledger, directory_service: None }
    }

    /// Names the service that is the global directory. Queries routed to it
    /// resolve through the owner's directory entry.
    #[must_use]
    pub fn with_directory_service(mut self, service: impl Into<String>) -> Self {
        self.directory_service = Some(service.into());
        self
    }

    pub fn routes(&self) -> &RoutingCache {
        &self.routes
    }

    /// Resolves an owner id to a service name.
    pub async fn lookup(&self, owner_id: &str) -> GatewayResult<String> {
        self.routes.lookup(owner_id).await
    }

    /// Reads `record_id` from the service `owner_id` routes to.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::RoutingNotFound`] if the owner id has no route.
    /// - [`GatewayError::Ledger`] if the query fails.
    /// - [`GatewayError::Parse`] if the answer is not a JSON document.
    #[tracing::instrument(skip(self))]
    pub async fn forward(&self, owner_id: &str, record_id: &str) -> GatewayResult<PolicyView> {
        let service = self.lookup(owner_id).await?;
        let (op, args) = if self.directory_service.as_deref() == Some(service.as_str()) {
            (OP_READ_REGIONAL_ASSET, vec![record_id.to_owned(), owner_id.to_owned()])
        } else {
            (OP_READ_ASSET, vec![record_id.to_owned()])
        };
        let payload = self
            .ledger
            .query(&service, op, &args)
            .await
            .map_err(|source| GatewayError::Ledger { service: service.clone(), source })?;
        let doc: PolicyDocument = serde_json::from_slice(&payload)
            .map_err(|source| GatewayError::Parse { service: service.clone(), source })?;

        tracing::debug!(service = %service, id = %doc.id, "Forwarded query");
        Ok(PolicyView {
            owner_id: owner_id.to_owned(),
            service,
            data_link: data_link(&doc.metadata),
            id: doc.id,
            owner: doc.owner,
            auth_roles: doc.auth_roles,
            grant: doc.grant,
            metadata: doc.metadata,
        })
    }

    /// Checks that every routed service is registered.
    ///
    /// A lazy cache that has not loaded yet has nothing to check.
    ///
    /// # Errors
    ///
    /// [`GatewayError::UnroutableService`] for the first route naming an
    /// unregistered service.
    pub fn validate_routes(&self, registry: &ShardRegistry) -> GatewayResult<()> {
        let Some(table) = self.routes.loaded() else {
            return Ok(());
        };
        for (owner_id, service) in table.entries() {
            if !registry.contains(service) {
                return Err(GatewayError::UnroutableService {
                    owner_id: owner_id.to_owned(),
                    service: service.to_owned(),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for FrontDoor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontDoor").field("routes", &self.routes).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use crosschain_directory::{InvokeError, testutil::Scenario};
    use rstest::rstest;

    use super::*;
    use crate::{ledger::ChannelLedgerClient, routing::RoutingTable};

    /// Answers every query with a fixed payload.
    struct FixedLedger(&'static str);

    /// Records every query and answers with an empty document.
    #[derive(Default)]
    struct RecordingLedger {
        queries: parking_lot::Mutex<Vec<(String, String, Vec<String>)>>,
    }

    #[async_trait]
    impl LedgerClient for RecordingLedger {
        async fn query(&self, service: &str, op: &str, args: &[String]) -> Result<Bytes, InvokeError> {
            self.queries.lock().push((service.to_owned(), op.to_owned(), args.to_vec()));
            Ok(Bytes::from_static(b"{}"))
        }
    }

    #[async_trait]
    impl LedgerClient for FixedLedger {
        async fn query(&self, _: &str, _: &str, _: &[String]) -> Result<Bytes, InvokeError> {
            Ok(Bytes::from_static(self.0.as_bytes()))
        }
    }

    fn routes() -> RoutingCache {
        RoutingCache::from_table([("HP1", "regionalA"), ("HP2", "regionalZ")].into_iter().collect())
    }

    #[rstest]
    #[case::https("https://data.example/p/1", true)]
    #[case::http("HTTP://data.example", true)]
    #[case::ipfs("ipfs://bafy", false)]
    #[case::empty("", false)]
    fn test_data_link(#[case] metadata: &str, #[case] linked: bool) {
        assert_eq!(data_link(metadata).is_some(), linked);
    }

    #[tokio::test]
    async fn test_forward_reads_policy_fields() {
        let ledger = FixedLedger(
            r#"{"ID":"pp1","owner":"Alice","authRoles":["doctor","nurse"],"grant":"read","metadata":"https://files.example/pp1"}"#,
        );
        let front = FrontDoor::new(routes(), Arc::new(ledger));

        let view = front.forward("HP1", "pp1").await.unwrap();
        assert_eq!(view.service, "regionalA");
        assert_eq!(view.auth_roles, ["doctor", "nurse"]);
        assert_eq!(view.data_link.as_deref(), Some("https://files.example/pp1"));
    }

    #[tokio::test]
    async fn test_forward_regional_record_fills_known_fields() {
        let scenario = Scenario::new().await;
        let ledger = ChannelLedgerClient::new(Arc::clone(&scenario.registry));
        let front = FrontDoor::new(routes(), Arc::new(ledger));

        let view = front.forward("HP1", "pc2").await.unwrap();
        assert_eq!(view.id, "pc2");
        assert_eq!(view.owner, "Alice");
        assert!(view.auth_roles.is_empty());
        assert_eq!(view.data_link, None);
    }

    #[tokio::test]
    async fn test_forward_errors() {
        let scenario = Scenario::new().await;
        let ledger = ChannelLedgerClient::new(Arc::clone(&scenario.registry));
        let front = FrontDoor::new(routes(), Arc::new(ledger));

        let err = front.forward("HPX", "pc2").await.unwrap_err();
        assert!(matches!(err, GatewayError::RoutingNotFound { ref owner_id } if owner_id == "HPX"));

        let err = front.forward("HP2", "pc2").await.unwrap_err();
        assert!(matches!(err, GatewayError::Ledger { ref service, .. } if service == "regionalZ"));

        let err = front.forward("HP1", "pc404").await.unwrap_err();
        assert!(matches!(err, GatewayError::Ledger { .. }));
    }

    #[tokio::test]
    async fn test_directory_route_asks_for_regional_asset() {
        let ledger = Arc::new(RecordingLedger::default());
        let routes =
            RoutingCache::from_table([("HP1", "regionalA"), ("HPG", "globalcc")].into_iter().collect());
        let front = FrontDoor::new(routes, Arc::clone(&ledger) as Arc<dyn LedgerClient>)
            .with_directory_service("globalcc");

        front.forward("HP1", "pc2").await.unwrap();
        front.forward("HPG", "pc2").await.unwrap();

        let queries = ledger.queries.lock();
        assert_eq!(queries[0], ("regionalA".into(), "ReadAsset".into(), vec!["pc2".into()]));
        assert_eq!(
            queries[1],
            ("globalcc".into(), "ReadRegionalAsset".into(), vec!["pc2".into(), "HPG".into()])
        );
    }

    #[tokio::test]
    async fn test_forward_unparseable_payload() {
        let front = FrontDoor::new(routes(), Arc::new(FixedLedger("not json")));
        let err = front.forward("HP1", "pp1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_validate_routes() {
        let scenario = Scenario::new().await;
        let ledger = Arc::new(ChannelLedgerClient::new(Arc::clone(&scenario.registry)));

        let good = RoutingCache::from_table(RoutingTable::from_iter([("HP1", "regionalA")]));
        FrontDoor::new(good, ledger.clone()).validate_routes(&scenario.registry).unwrap();

        let err = FrontDoor::new(routes(), ledger).validate_routes(&scenario.registry).unwrap_err();
        assert!(matches!(err, GatewayError::UnroutableService { ref service, .. } if service == "regionalZ"));
    }
}
