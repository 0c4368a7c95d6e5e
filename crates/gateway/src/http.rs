//! HTTP surface of the front door.
//!
//! Endpoints:
//! - `GET /readPP/?hospitalID=..&policyID=..` - forwards the query; JSON
//!   [`PolicyView`](crate::front_door::PolicyView) on success
//! - `GET /health` - probes every registered store; `ok`, or `503` naming
//!   the services that failed
//!
//! Any failure is a `500` with a plain text `Failed to ...: <cause>` body.
//! The typed error is logged before it is collapsed.

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use crosschain_directory::ShardRegistry;
use serde::Deserialize;

use crate::{error::GatewayError, front_door::FrontDoor};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    front_door: Arc<FrontDoor>,
    registry: Arc<ShardRegistry>,
    timeout: Duration,
}

impl AppState {
    pub fn new(front_door: Arc<FrontDoor>, registry: Arc<ShardRegistry>, timeout: Duration) -> Self {
        Self { front_door, registry, timeout }
    }
}

/// Query parameters of `/readPP/`. Missing parameters are empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadPolicyParams {
    #[serde(rename = "hospitalID", default)]
    pub owner_id: String,
    #[serde(rename = "policyID", default)]
    pub record_id: String,
}

/// Builds the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/readPP/", get(read_policy))
        .route("/readPP", get(read_policy))
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health - probes the store behind every registered service.
pub async fn health(State(state): State<AppState>) -> Response {
    let failed = state.registry.health_check().await;
    if failed.is_empty() {
        return "ok".into_response();
    }
    let services: Vec<&str> = failed.iter().map(|(service, _)| *service).collect();
    (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {}", services.join(", "))).into_response()
}

/// GET /readPP/ - forwards one owner id / record id query.
pub async fn read_policy(
    State(state): State<AppState>,
    Query(params): Query<ReadPolicyParams>,
) -> Response {
    let forward = state.front_door.forward(&params.owner_id, &params.record_id);
    let result = match tokio::time::timeout(state.timeout, forward).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout { timeout: state.timeout }),
    };

    match result {
        Ok(view) => Json(view).into_response(),
        Err(e) => {
            tracing::warn!(
                owner_id = %params.owner_id,
                record_id = %params.record_id,
                error = ?e,
                "Request failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, e.public_message()).into_response()
        },
    }
}
