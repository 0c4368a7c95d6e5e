//! Process wiring: config → shard services → registries → front door.
//!
//! ```text
//!                 ┌──────────── front registry ────────────┐
//!  FrontDoor ───► │ regionalCC1 … regionalCCn   globalcc   │
//!                 └──────┬──────────────────────────┬──────┘
//!                        │                          │
//!                 RegionalShard ◄── shard registry ─ GlobalDirectory
//! ```
//!
//! The directory resolves through a registry holding only the regional
//! shards. The front registry adds the directory itself, so the two never
//! reference each other in a cycle.

use std::sync::Arc;

use axum::Router;
use crosschain_directory::{GlobalDirectory, HopMetrics, RegionalShard, ShardEndpoint, ShardRegistry};
use crosschain_storage::MemoryBackend;
use tokio::net::TcpListener;

use crate::{
    config::{GatewayConfig, RoutingMode},
    error::{GatewayError, GatewayResult},
    front_door::FrontDoor,
    http::{AppState, router},
    ledger::ChannelLedgerClient,
    routing::{CsvFileSource, RoutingCache},
};

/// A fully wired gateway.
pub struct Gateway {
    config: GatewayConfig,
    front_door: Arc<FrontDoor>,
    directory: Arc<GlobalDirectory<MemoryBackend>>,
    registry: Arc<ShardRegistry>,
    metrics: HopMetrics,
}

impl Gateway {
    /// Builds and seeds every service named by `config`.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Setup`] if seeding a shard or the directory fails.
    /// - [`GatewayError::Registry`] if two services share a name.
    /// - [`GatewayError::RoutingLoad`] if an eager routing load fails.
    /// - [`GatewayError::UnroutableService`] if an eagerly loaded route
    ///   names an unregistered service.
    #[tracing::instrument(skip_all, fields(scope = %config.scope()))]
    pub async fn build(config: GatewayConfig) -> GatewayResult<Self> {
        let metrics = HopMetrics::new();

        let mut regional = Vec::with_capacity(config.shards().len());
        for spec in config.shards() {
            let shard = Arc::new(RegionalShard::with_metrics(MemoryBackend::new(), metrics.clone()));
            shard.init_ledger(spec.seed).await?;
            regional.push((spec.name.clone(), shard));
        }

        let mut shard_registry = ShardRegistry::builder(config.scope());
        for (name, shard) in &regional {
            shard_registry =
                shard_registry.register(name.clone(), Arc::clone(shard) as Arc<dyn ShardEndpoint>);
        }
        let shard_registry = Arc::new(shard_registry.build().map_err(GatewayError::Registry)?);

        let directory = Arc::new(
            GlobalDirectory::builder()
                .store(MemoryBackend::new())
                .registry(shard_registry)
                .metrics(metrics.clone())
                .build(),
        );
        for entry in config.directory() {
            directory.create(entry).await?;
        }

        let mut front_registry = ShardRegistry::builder(config.scope());
        for (name, shard) in regional {
            front_registry = front_registry.register(name, shard as Arc<dyn ShardEndpoint>);
        }
        let registry = Arc::new(
            front_registry
                .register(config.directory_service(), Arc::clone(&directory) as Arc<dyn ShardEndpoint>)
                .build()
                .map_err(GatewayError::Registry)?,
        );

        let source = Arc::new(CsvFileSource::new(config.routing_table()));
        let routes = match config.routing_mode() {
            RoutingMode::Eager => RoutingCache::eager(source.as_ref()).await?,
            RoutingMode::Lazy => RoutingCache::lazy(source),
        };
        let ledger = Arc::new(ChannelLedgerClient::new(Arc::clone(&registry)));
        let front_door =
            FrontDoor::new(routes, ledger).with_directory_service(config.directory_service());
        front_door.validate_routes(&registry)?;

        tracing::info!(
            services = registry.services().count(),
            routes = front_door.routes().loaded().map(|t| t.len()),
            "Gateway ready"
        );
        Ok(Self { config, front_door: Arc::new(front_door), directory, registry, metrics })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn front_door(&self) -> &Arc<FrontDoor> {
        &self.front_door
    }

    pub fn directory(&self) -> &Arc<GlobalDirectory<MemoryBackend>> {
        &self.directory
    }

    /// The registry the front door forwards through.
    pub fn registry(&self) -> &Arc<ShardRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &HopMetrics {
        &self.metrics
    }

    /// The HTTP router for this gateway.
    pub fn router(&self) -> Router {
        router(AppState::new(
            Arc::clone(&self.front_door),
            Arc::clone(&self.registry),
            self.config.request_timeout(),
        ))
    }

    /// Serves HTTP on `listener` until `shutdown` completes, then logs the
    /// collected hop metrics.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router()).with_graceful_shutdown(shutdown).await?;
        self.metrics.log_metrics();
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("listen_addr", &self.config.listen_addr())
            .field("registry", &self.registry)
            .field("front_door", &self.front_door)
            .finish_non_exhaustive()
    }
}
