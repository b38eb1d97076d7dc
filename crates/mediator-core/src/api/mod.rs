//! HTTP/WebSocket API layer: binds the combined audio-ingress + webhook
//! server and wires axum state extraction to the composition root's
//! services (§6.1, §6.3).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::ingress::{ingress_ws_handler, IngressContext};
use crate::webhook::{health_handler, webhook_handler, WebhookDispatcher};

/// Errors that can occur when starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    Bind(SocketAddr, std::io::Error),
    #[error("Server loop exited with an error: {0}")]
    Serve(std::io::Error),
}

/// Shared application state for the combined WS + HTTP router.
///
/// Thin: all business logic lives in the ingress, orchestrator, bridge,
/// sink, and webhook modules this wires together.
#[derive(Clone)]
pub struct AppState {
    pub ingress: IngressContext,
    pub webhook: Arc<WebhookDispatcher>,
}

impl FromRef<AppState> for IngressContext {
    fn from_ref(state: &AppState) -> Self {
        state.ingress.clone()
    }
}

impl FromRef<AppState> for Arc<WebhookDispatcher> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.webhook)
    }
}

/// Builds the combined router: the inbound audio socket plus the webhook
/// control plane and health check (§6.1, §6.3).
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ingress_ws_handler))
        .route("/webhooks/{platform}", post(webhook_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves the combined router until the listener is closed or
/// the process is signaled to shut down (the caller owns cancellation;
/// this future simply runs `axum::serve` to completion).
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(addr, e))?;
    log::info!("[Server] listening on {}", addr);
    let app = create_router(state);
    axum::serve(listener, app).await.map_err(ServerError::Serve)?;
    Ok(())
}
