//! HTTP server implementation using Axum.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use courier_core::config::GatewayConfig;
use courier_core::traits::MessageStore;
use courier_scheduler::Scheduler;
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    /// Dispatch scheduler controlled by `/api/auto`.
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<dyn MessageStore>,
    /// Effective per-message character limit applied at intake.
    pub char_limit: usize,
    pub start_time: std::time::Instant,
}

/// API key middleware. Accepts `X-API-Key` or `Authorization: Bearer`.
async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Response {
    let expected = state.gateway_config.api_key.as_str();
    // Empty key disables the check
    if expected.is_empty() {
        return next.run(req).await;
    }

    if presented_key(req.headers()) == Some(expected) {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "rejected request without valid API key");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Invalid or missing API key. Provide X-API-Key header."
        })),
    )
        .into_response()
}

/// Key from `X-API-Key`, falling back to `Authorization` with an optional
/// `Bearer ` prefix.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };
    if let Some(key) = header("X-API-Key") {
        return Some(key);
    }
    header("Authorization").map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    build_router_from_arc(Arc::new(state))
}

pub fn build_router_from_arc(shared: Arc<AppState>) -> Router {
    // Protected routes: API key required when one is configured
    let protected = Router::new()
        .route(
            "/api/auto",
            get(super::routes::auto_control).post(super::routes::auto_control),
        )
        .route("/api/status", get(super::routes::scheduler_status))
        .route("/api/sent", get(super::routes::list_sent))
        .route("/api/messages", post(super::routes::create_message))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_api_key,
        ));

    // Public routes
    let public = Router::new().route("/health", get(super::routes::health_check));

    protected
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server and run until `shutdown` resolves.
pub async fn start<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let gateway = &state.gateway_config;
    let addr = format!("{}:{}", gateway.host, gateway.port);
    if gateway.api_key.is_empty() {
        tracing::warn!("⚠️ No API key configured; /api routes are open");
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
