//! Bridge implementation that maps domain events to broadcast transport.
//!
//! The [`BroadcastEventBridge`] lives at the boundary between domain services
//! and transport concerns, mapping typed domain events onto the local
//! observer's broadcast channel.

use tokio::sync::broadcast;

use super::emitter::EventEmitter;
use super::{BroadcastEvent, SessionEvent, SpeakerEvent, TranscriptBroadcast};

/// Bridges domain events to the local observer's broadcast channel.
///
/// This adapter implements [`EventEmitter`] by forwarding events to a
/// `tokio::sync::broadcast` channel. Subscribers are typically the local
/// observer connection; bot-registered ingress connections receive
/// transcript events through [`crate::sink`] instead, not through this
/// bridge.
#[derive(Clone)]
pub struct BroadcastEventBridge {
    tx: broadcast::Sender<BroadcastEvent>,
}

impl BroadcastEventBridge {
    /// Creates a new bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Creates a new bridge wrapping an existing broadcast sender.
    pub fn with_sender(tx: broadcast::Sender<BroadcastEvent>) -> Self {
        Self { tx }
    }

    /// Returns a new receiver for the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.tx.subscribe()
    }

    /// Returns a reference to the broadcast sender.
    pub fn sender(&self) -> &broadcast::Sender<BroadcastEvent> {
        &self.tx
    }
}

impl EventEmitter for BroadcastEventBridge {
    fn emit_session(&self, event: SessionEvent) {
        if let Err(e) = self.tx.send(BroadcastEvent::Session(event)) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }

    fn emit_speaker(&self, event: SpeakerEvent) {
        if let Err(e) = self.tx.send(BroadcastEvent::Speaker(event)) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }

    fn emit_transcript(&self, event: TranscriptBroadcast) {
        if let Err(e) = self.tx.send(BroadcastEvent::Transcript(event)) {
            log::trace!("[EventBridge] No broadcast receivers: {}", e);
        }
    }
}
