//! Event system for the local observer connection.
//!
//! This module provides:
//! - [`EventEmitter`] trait for domain services to emit events
//! - Event types for session lifecycle and speaker state
//!
//! The actual transport (a `tokio::sync::broadcast` channel consumed by the
//! optional local observer) is handled separately via [`BroadcastEventBridge`].

mod bridge;
mod emitter;

pub use bridge::BroadcastEventBridge;
pub use emitter::{EventEmitter, LoggingEventEmitter, NoopEventEmitter};

use serde::Serialize;
use uuid::Uuid;

/// Events broadcast to the local observer.
///
/// This enum categorizes every event the mediator can raise outside of the
/// transcript stream itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BroadcastEvent {
    /// Session lifecycle transitions.
    Session(SessionEvent),
    /// Speaker changes derived from speaker-metadata frames.
    Speaker(SpeakerEvent),
    /// Transcript events, mirrored here for the local observer.
    Transcript(TranscriptBroadcast),
}

/// Session lifecycle events (orchestrator state machine transitions).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A session was created (first ingress connection accepted).
    Created {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        timestamp: u64,
    },
    /// The orchestrator transitioned state.
    StateChanged {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        from: String,
        to: String,
        timestamp: u64,
    },
    /// A fatal error was published (e.g. provider init failure).
    FatalError {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        message: String,
        timestamp: u64,
    },
    /// The session was torn down and all resources released.
    Terminated {
        #[serde(rename = "sessionId")]
        session_id: Uuid,
        timestamp: u64,
    },
}

/// Speaker-change events (rising speaking edge only).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerEvent {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    pub speaker_name: String,
    pub timestamp: u64,
}

impl From<SessionEvent> for BroadcastEvent {
    fn from(event: SessionEvent) -> Self {
        BroadcastEvent::Session(event)
    }
}

impl From<SpeakerEvent> for BroadcastEvent {
    fn from(event: SpeakerEvent) -> Self {
        BroadcastEvent::Speaker(event)
    }
}

/// Transcript event mirrored to the observer channel. The bot-registered
/// ingress connections receive the richer [`crate::sink::TranscriptEvent`]
/// directly from the transcript router, not through this broadcast.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptBroadcast {
    #[serde(rename = "sessionId")]
    pub session_id: Uuid,
    pub text: String,
    #[serde(rename = "isFinal")]
    pub is_final: bool,
    pub timestamp: u64,
}

impl From<TranscriptBroadcast> for BroadcastEvent {
    fn from(event: TranscriptBroadcast) -> Self {
        BroadcastEvent::Transcript(event)
    }
}
