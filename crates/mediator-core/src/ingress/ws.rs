//! The inbound audio WebSocket handler.
//!
//! One connection is the common case, but the orchestrator allows more than
//! one concurrent ingress connection per session (§8 boundary behavior): a
//! reconnect does not reset the session, it just adds or removes a counted
//! connection. A single connection may also promote itself to a bot-socket
//! transcript subscriber by sending a register frame; after that it no
//! longer contributes PCM.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

use crate::session::{Session, SessionOrchestrator};
use crate::sink::{TranscriptEvent, TranscriptRouter};

use super::{classify, route_pcm_frame, ClassifiedFrame};

const HEARTBEAT_INTERVAL_SECS: u64 = 15;

/// Everything one ingress connection needs: the session it belongs to, the
/// orchestrator to notify of connect/disconnect/speaker events, the channel
/// feeding PCM to the Provider Bridge, and the router bot sockets subscribe
/// to for outbound transcripts.
#[derive(Clone)]
pub struct IngressContext {
    pub session: Arc<Session>,
    pub orchestrator: Arc<SessionOrchestrator>,
    pub audio_tx: mpsc::UnboundedSender<Vec<u8>>,
    pub transcript_router: Arc<TranscriptRouter>,
}

pub async fn ingress_ws_handler(
    ws: WebSocketUpgrade,
    State(ctx): State<IngressContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ingress_socket(socket, ctx))
}

async fn recv_transcript(rx: &mut Option<broadcast::Receiver<TranscriptEvent>>) -> Option<TranscriptEvent> {
    match rx {
        Some(r) => r.recv().await.ok(),
        None => std::future::pending().await,
    }
}

async fn handle_ingress_socket(socket: WebSocket, ctx: IngressContext) {
    let (mut sender, mut receiver) = socket.split();
    let mut bot_rx: Option<broadcast::Receiver<TranscriptEvent>> = None;

    ctx.orchestrator.handle_ingress_connected();
    let cancel = ctx.orchestrator.cancel_token().clone();

    log::info!("[Ingress] Session {}: connection opened", ctx.session.id);

    let mut heartbeat = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            transcript = recv_transcript(&mut bot_rx) => {
                let Some(event) = transcript else { continue };
                match serde_json::to_string(&event.to_envelope()) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => log::error!(
                        "[Ingress] Session {}: failed to encode transcript envelope: {}",
                        ctx.session.id, e
                    ),
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        handle_payload(&ctx, &mut bot_rx, &data);
                    }
                    Some(Ok(Message::Text(text))) => {
                        handle_payload(&ctx, &mut bot_rx, text.as_bytes());
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    ctx.orchestrator.handle_ingress_disconnected();
    log::info!("[Ingress] Session {}: connection closed", ctx.session.id);
}

/// Classifies one inbound payload and dispatches it. A connection already
/// registered as a bot socket re-classifying to `Register` is a no-op: the
/// subscription was established the first time.
fn handle_payload(
    ctx: &IngressContext,
    bot_rx: &mut Option<broadcast::Receiver<TranscriptEvent>>,
    payload: &[u8],
) {
    match classify(payload) {
        ClassifiedFrame::Register => {
            if bot_rx.is_none() {
                *bot_rx = Some(ctx.transcript_router.subscribe_bot());
                log::info!("[Ingress] Session {}: bot subscriber registered", ctx.session.id);
            }
        }
        ClassifiedFrame::SpeakerMeta(info) => {
            ctx.orchestrator.handle_speaker_info(info);
        }
        ClassifiedFrame::Pcm(bytes) => {
            route_pcm_frame(&ctx.session, &ctx.audio_tx, bytes);
        }
    }
}
