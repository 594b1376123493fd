//! # Coffer Endpoint Server
//!
//! A self-hostable remote endpoint speaking the blob protocol the coordinator
//! uses, laid out like a hosted script deployment so a bare deployment id
//! plus a URL template is enough to reach it.
//!
//! ## Endpoints
//!
//! - `GET  /macros/s/{deployment}/exec?action=read` - Fetch the stored blob (or empty)
//! - `POST /macros/s/{deployment}/exec?action=save` - Store the body, answer `ok`
//! - `GET  /health` - Health check
//!
//! Unknown deployments answer 404. Unknown actions answer 200 with a
//! non-`ok` body, which clients read as failure.
//!
//! ## Security Configuration
//!
//! - `server.cors_origins` / `COFFER_CORS_ORIGINS`: allowed origins, or `*` (default: localhost only)
//! - `server.rate_limit` / `COFFER_RATE_LIMIT`: requests per second (default: 100, 0 to disable)

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::find_deployment;
pub use handlers::{exec_get_handler, exec_post_handler, health_handler};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    Action, ActionQuery, HealthResponse, SAVE_REQUIRES_POST_BODY, UNKNOWN_ACTION_BODY,
};

use crate::config::ServerConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use coffer_core::{CofferError, RedbSlots, SlotStore};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: one blob slot per deployment.
#[derive(Clone)]
pub struct AppState {
    /// Blob storage keyed by deployment id.
    pub blobs: Arc<dyn SlotStore>,
    /// Deployment ids this server answers for.
    pub deployments: Arc<Vec<String>>,
}

impl AppState {
    #[must_use]
    pub fn new(blobs: Arc<dyn SlotStore>, deployments: Vec<String>) -> Self {
        Self {
            blobs,
            deployments: Arc::new(deployments),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `["*"]`: allows all origins
/// - empty: localhost only
/// - otherwise: exactly the listed origins
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. Any web page can read and overwrite blobs!");
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit - caps blob size
/// 4. Rate Limiting - global budget (if enabled)
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/macros/s/{deployment}/exec",
            get(handlers::exec_get_handler).post(handlers::exec_post_handler),
        );

    match create_rate_limiter(config.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", config.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(&config.cors_origins))
                .layer(axum::extract::DefaultBodyLimit::max(config.body_limit_bytes)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Open the blob database and serve until Ctrl+C.
pub async fn run_server(config: &ServerConfig, quota: u64) -> Result<(), CofferError> {
    let blobs = RedbSlots::open_with_quota(&config.data_path, quota)?;
    let state = AppState::new(Arc::new(blobs), config.deployments.clone());
    let router = create_router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CofferError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!(
        deployments = config.deployments.len(),
        "Coffer endpoint server listening on {}",
        addr
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CofferError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
