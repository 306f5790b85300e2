//! HTTP surface for the role gate
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /v1/access` - Access view for the calling user
//! - `POST /v1/roles/refresh` - Re-read the caller's roles from the store
//! - `GET /metrics` - Prometheus cache metrics

use crate::access::{decide, AccessDecision, AccessView};
use crate::gate::{AuthGate, GateConfig, ProxyHeaderGate};
use crate::resolver::RoleResolver;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<RoleResolver>,
    pub gate_config: Arc<GateConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(resolver: Arc<RoleResolver>, gate_config: GateConfig) -> Self {
        Self {
            resolver,
            gate_config: Arc::new(gate_config),
            start_time: Instant::now(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    version: String,
}

/// Access response
#[derive(Debug, Serialize)]
struct AccessResponse {
    view: AccessView,
    display_name: String,
    username: String,
    roles: Vec<String>,
    logout_url: String,
}

/// Returned to callers the proxy did not authenticate
#[derive(Debug, Serialize)]
struct LoginRequired {
    error: String,
    login_url: String,
}

struct MetricsResponse {
    metrics: String,
}

impl IntoResponse for MetricsResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            self.metrics,
        )
            .into_response()
    }
}

fn access_response(gate: &ProxyHeaderGate, decision: AccessDecision) -> Response {
    match decision.identity {
        None => (
            StatusCode::UNAUTHORIZED,
            Json(LoginRequired {
                error: "unauthenticated".to_string(),
                login_url: gate.login_url(),
            }),
        )
            .into_response(),
        Some(identity) => Json(AccessResponse {
            view: decision.view,
            display_name: identity.display_name,
            username: identity.stable_username,
            roles: decision.roles,
            logout_url: gate.logout_url(),
        })
        .into_response(),
    }
}

/// GET /v1/access
async fn access(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let gate = ProxyHeaderGate::from_headers(&headers, &state.gate_config);
    let decision = decide(&gate, &state.resolver).await;
    access_response(&gate, decision)
}

/// POST /v1/roles/refresh
async fn refresh_roles(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let gate = ProxyHeaderGate::from_headers(&headers, &state.gate_config);
    if let Some(identity) = gate.current_identity() {
        info!("Refreshing roles for {}", identity.stable_username);
        state.resolver.refresh(&identity.stable_username).await;
    }
    let decision = decide(&gate, &state.resolver).await;
    access_response(&gate, decision)
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: crate::VERSION.to_string(),
    })
}

/// GET /metrics
async fn metrics(State(state): State<AppState>) -> MetricsResponse {
    let stats = state.resolver.cache().stats();
    let uptime = state.start_time.elapsed().as_secs();

    let metrics = format!(
        "# HELP rolegate_uptime_seconds Server uptime in seconds\n\
         # TYPE rolegate_uptime_seconds gauge\n\
         rolegate_uptime_seconds {}\n\
         \n\
         # HELP rolegate_role_cache_hits_total Role cache hits\n\
         # TYPE rolegate_role_cache_hits_total counter\n\
         rolegate_role_cache_hits_total {}\n\
         \n\
         # HELP rolegate_role_cache_misses_total Role cache misses\n\
         # TYPE rolegate_role_cache_misses_total counter\n\
         rolegate_role_cache_misses_total {}\n\
         \n\
         # HELP rolegate_role_cache_expirations_total Expired entries found on lookup\n\
         # TYPE rolegate_role_cache_expirations_total counter\n\
         rolegate_role_cache_expirations_total {}\n\
         \n\
         # HELP rolegate_role_cache_entries Entries currently cached\n\
         # TYPE rolegate_role_cache_entries gauge\n\
         rolegate_role_cache_entries {}\n",
        uptime, stats.hits, stats.misses, stats.expirations, stats.entries
    );

    MetricsResponse { metrics }
}

/// Create the HTTP router with all endpoints
pub fn router(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_check))
        .route("/v1/access", get(access))
        .route("/v1/roles/refresh", post(refresh_roles))
        .route("/metrics", get(metrics))
        .layer(trace)
        .with_state(state)
}
