//! HTTP API serving dashboard payloads, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use dashboard_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::DashboardMetrics,
    service::{payloads, InfraDashboardService},
    store::Stores,
    DashboardError, ManagerId, Viewer,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const TIMEZONE_HEADER: &str = "x-user-timezone";

const DEFAULT_USER_ID: u64 = 1;
const DEFAULT_TIMEZONE: &str = "UTC";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub health_registry: HealthRegistry,
    pub metrics: DashboardMetrics,
    /// When set, every request uses this instant as "now"
    pub pinned_now: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new(stores: Stores, health_registry: HealthRegistry, metrics: DashboardMetrics) -> Self {
        Self {
            stores,
            health_registry,
            metrics,
            pinned_now: None,
        }
    }

    pub fn with_pinned_now(mut self, now: Option<DateTime<Utc>>) -> Self {
        self.pinned_now = now;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.pinned_now.unwrap_or_else(Utc::now)
    }
}

/// Dashboard payloads addressable under `/api/ems_infra`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
    ClusterHeatmap,
    EmsUtilization,
    RecentHosts,
    RecentVms,
    AggregateStatus,
}

impl Payload {
    fn from_path(segment: &str) -> Option<Self> {
        match segment {
            payloads::CLUSTER_HEATMAP => Some(Payload::ClusterHeatmap),
            payloads::EMS_UTILIZATION => Some(Payload::EmsUtilization),
            payloads::RECENT_HOSTS => Some(Payload::RecentHosts),
            payloads::RECENT_VMS => Some(Payload::RecentVms),
            payloads::AGGREGATE_STATUS => Some(Payload::AggregateStatus),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Payload::ClusterHeatmap => payloads::CLUSTER_HEATMAP,
            Payload::EmsUtilization => payloads::EMS_UTILIZATION,
            Payload::RecentHosts => payloads::RECENT_HOSTS,
            Payload::RecentVms => payloads::RECENT_VMS,
            Payload::AggregateStatus => payloads::AGGREGATE_STATUS,
        }
    }
}

/// Error response wrapper mapping dashboard errors to status codes
pub struct ApiError(pub DashboardError);

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            DashboardError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DashboardError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DashboardError::NotFound { .. } => StatusCode::NOT_FOUND,
            DashboardError::Forbidden { .. } => StatusCode::FORBIDDEN,
            DashboardError::ScopeRequired(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "bad_request", "message": message })),
    )
        .into_response()
}

/// Viewer identity from request headers, defaulting to user 1 in UTC
fn viewer_from_headers(headers: &HeaderMap) -> Result<Viewer, String> {
    let user_id = match headers.get(USER_ID_HEADER) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| format!("invalid {} header", USER_ID_HEADER))?,
        None => DEFAULT_USER_ID,
    };

    let timezone = match headers.get(TIMEZONE_HEADER) {
        Some(value) => value
            .to_str()
            .map_err(|_| format!("invalid {} header", TIMEZONE_HEADER))?
            .trim()
            .to_string(),
        None => DEFAULT_TIMEZONE.to_string(),
    };

    Ok(Viewer::new(user_id, timezone))
}

async fn build_payload(
    state: &AppState,
    ems_id: Option<ManagerId>,
    payload: Payload,
    viewer: Viewer,
) -> Result<Response, DashboardError> {
    let service =
        InfraDashboardService::new(state.stores.clone(), ems_id, viewer, state.now()).await?;

    let response = match payload {
        Payload::ClusterHeatmap => Json(service.cluster_heatmap_data().await?).into_response(),
        Payload::EmsUtilization => Json(service.ems_utilization_data().await?).into_response(),
        Payload::RecentHosts => Json(service.recent_hosts_data().await?).into_response(),
        Payload::RecentVms => Json(service.recent_vms_data().await?).into_response(),
        Payload::AggregateStatus => Json(service.aggregate_status_data()?).into_response(),
    };

    Ok(response)
}

async fn respond(
    state: &AppState,
    ems_id: Option<ManagerId>,
    segment: &str,
    headers: &HeaderMap,
) -> Response {
    let Some(payload) = Payload::from_path(segment) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "not_found", "message": format!("unknown payload {}", segment) })),
        )
            .into_response();
    };

    let viewer = match viewer_from_headers(headers) {
        Ok(viewer) => viewer,
        Err(message) => return bad_request(message),
    };

    let reads = payloads::stores_read(payload.name(), ems_id.is_some());
    // Split the response off so the non-Sync body is not borrowed across the await
    let (response, outcome) = match build_payload(state, ems_id, payload, viewer).await {
        Ok(response) => (Some(response), Ok(())),
        Err(err) => (None, Err(err)),
    };
    state.health_registry.record_outcome(reads, &outcome).await;

    match (response, outcome) {
        (Some(response), _) => response,
        (None, Ok(())) => unreachable!("successful payload always carries a response"),
        (None, Err(err)) => {
            if let Some(store) = err.failed_store() {
                warn!(store = %store, error = %err, "Payload failed on upstream store");
            }
            ApiError(err).into_response()
        }
    }
}

async fn unscoped_payload(
    State(state): State<Arc<AppState>>,
    Path(segment): Path<String>,
    headers: HeaderMap,
) -> Response {
    respond(&state, None, &segment, &headers).await
}

async fn scoped_payload(
    State(state): State<Arc<AppState>>,
    Path((ems_id, segment)): Path<(ManagerId, String)>,
    headers: HeaderMap,
) -> Response {
    respond(&state, Some(ems_id), &segment, &headers).await
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // Still serving
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %err, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/ems_infra/:payload", get(unscoped_payload))
        .route("/api/ems_infra/:id/:payload", get(scoped_payload))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
