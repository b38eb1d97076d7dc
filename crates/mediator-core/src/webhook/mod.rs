//! Webhook Intake & Control Plane (§4.5).
//!
//! Accepts `POST /webhooks/<platform>` bodies of shape
//! `{event, data, timestamp?}`, decodes `event` against the closed set
//! (§6.3), and dispatches to a handler table keyed by event kind plus an
//! optional wildcard handler. Dispatch is serialized per session: the next
//! webhook for the same session does not start until the previous handler
//! invocation has completed, even though handlers are async.

mod handler;
mod types;

pub use handler::{HandlerFn, WebhookDispatcher};
pub use types::{BotStatus, ControlEvent, WebhookBody};

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::error::{MediatorError, MediatorResult};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: String,
}

/// `GET /health`.
pub async fn health_handler(
    State(dispatcher): State<std::sync::Arc<WebhookDispatcher>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "mediator-server",
        timestamp: dispatcher.clock.now_iso(),
    })
}

#[derive(Serialize)]
struct WebhookAck {
    ok: bool,
}

/// `POST /webhooks/<platform>`. Malformed JSON or an unrecognized envelope
/// shape returns 400 without mutating any state (§7 error 5); a well-formed
/// but unrecognized `event` string is accepted and routed to the wildcard
/// handler only, never rejected (the event set may grow upstream).
pub async fn webhook_handler(
    Path(platform): Path<String>,
    State(dispatcher): State<std::sync::Arc<WebhookDispatcher>>,
    body: String,
) -> MediatorResult<Json<WebhookAck>> {
    let parsed: WebhookBody = serde_json::from_str(&body)
        .map_err(|e| MediatorError::MalformedWebhook(e.to_string()))?;
    let event = ControlEvent::decode(&parsed.event, parsed.data)
        .map_err(MediatorError::MalformedWebhook)?;

    log::info!("[Webhook] platform={} event={}", platform, parsed.event);
    dispatcher.dispatch(event).await;
    Ok(Json(WebhookAck { ok: true }))
}
