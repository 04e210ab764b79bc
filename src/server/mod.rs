//! HTTP surface
//!
//! - `GET /joke` starts a new thread and returns the agent's joke
//! - `GET /feedback?reaction=..&threadId=..` continues an existing thread
//! - `GET /health` reports liveness
//!
//! Each turn runs inside a SERVER span opened by the handler.

pub mod handlers;

use crate::agent::AgentRunOrchestrator;
use crate::config::ServerConfig;
use crate::telemetry::AgentTracer;
use crate::{QuipError, Result};
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared, read-only state of every request
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AgentRunOrchestrator>,
    pub tracer: AgentTracer,
    pub service_name: String,
}

impl AppState {
    pub fn new(
        orchestrator: AgentRunOrchestrator,
        tracer: AgentTracer,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            tracer,
            service_name: service_name.into(),
        }
    }
}

/// CORS policy from the configured origin list
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Build the application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/joke", get(handlers::joke))
        .route("/feedback", get(handlers::feedback))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
}

/// Serve until `shutdown` resolves, then drain in-flight requests
pub async fn serve<S>(config: &ServerConfig, state: AppState, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let app = router(state, config);
    let bind_addr = config.bind_address();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| QuipError::internal_error(format!("failed to bind {}: {}", bind_addr, e)))?;

    info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| QuipError::internal_error(format!("server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}
