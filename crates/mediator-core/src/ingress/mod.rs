//! Audio Ingress (§4.2): accepts the inbound streaming socket, classifies
//! each frame, and demultiplexes it to the session orchestrator, the
//! Provider Bridge, or the transcript subscriber set.

mod ws;

pub use ws::{ingress_ws_handler, IngressContext};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::session::{Session, SpeakerInfo};

/// The three frame shapes Audio Ingress recognizes on the inbound socket.
#[derive(Debug)]
pub enum ClassifiedFrame {
    /// `{type:"register", client:"bot"}` — a bot-side transcript subscriber.
    Register,
    /// A speaker-metadata JSON array.
    SpeakerMeta(SpeakerInfo),
    /// Anything else: raw PCM bytes.
    Pcm(Vec<u8>),
}

/// Classifies one inbound frame payload.
///
/// Attempts a UTF-8 + JSON parse of the payload; if it succeeds and matches
/// one of the two structured shapes, returns that. Otherwise — including a
/// payload that is valid JSON but an unrecognized shape — the frame is
/// treated as PCM, preserving forward compatibility (§4.2).
pub fn classify(payload: &[u8]) -> ClassifiedFrame {
    if let Ok(text) = std::str::from_utf8(payload) {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            if is_register_frame(&value) {
                return ClassifiedFrame::Register;
            }
            if let Some(speaker) = parse_speaker_meta(&value) {
                return ClassifiedFrame::SpeakerMeta(speaker);
            }
        }
    }
    ClassifiedFrame::Pcm(payload.to_vec())
}

/// Forwards a classified PCM frame to the Provider Bridge, or drops it with
/// a counter increment. A frame is dropped, never buffered, whenever the
/// gate is closed or the bridge has not yet reported its connection open
/// (§4.2: "not buffered, to avoid unbounded memory under slow
/// initialization") or when the bridge's channel has already gone away.
pub fn route_pcm_frame(session: &Session, audio_tx: &mpsc::UnboundedSender<Vec<u8>>, bytes: Vec<u8>) {
    if !session.is_gate_open() || !session.is_bridge_open() {
        session.record_dropped_frame();
        return;
    }
    if audio_tx.send(bytes).is_err() {
        log::warn!("[Ingress] Session {}: bridge channel closed, frame dropped", session.id);
        session.record_dropped_frame();
    }
}

fn is_register_frame(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("register") && value.get("client").is_some()
}

fn parse_speaker_meta(value: &Value) -> Option<SpeakerInfo> {
    let first = value.as_array()?.first()?;
    let name = first.get("name")?.as_str()?.to_string();
    let id = first.get("id")?.as_i64()?;
    let timestamp = first.get("timestamp")?.as_u64()?;
    let is_speaking = first.get("isSpeaking")?.as_bool()?;
    Some(SpeakerInfo {
        name,
        id,
        timestamp,
        is_speaking,
    })
}
