//! Transcript Sink & Router (§4.4).
//!
//! Owns the fan-out to the three subscriber kinds — bot-registered ingress
//! connections, the local observer, and the journal writer — without
//! letting a slow or errored subscriber stall the others.

mod journal;

pub use journal::{run_journal_writer, JournalCommand, SessionJournal};

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use crate::bridge::ProviderTranscript;
use crate::clock::Clock;
use crate::events::{EventEmitter, TranscriptBroadcast};
use crate::session::SpeakerInfo;

/// Capacity of the bot-socket broadcast channel. A lagging subscriber loses
/// the oldest buffered events rather than stalling delivery to the others
/// (drop-oldest policy for network subscribers, §9).
const BOT_CHANNEL_CAPACITY: usize = 256;

/// A fully-formed transcript event: a provider message plus the session
/// context (speaker snapshot, arrival time) needed to persist and route it.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEvent {
    pub text: String,
    pub is_final: bool,
    pub receive_timestamp: u64,
    /// ISO-8601 form of `receive_timestamp`, carried alongside it so the
    /// journal can persist per-entry timestamps in the structured record's
    /// shape (§4.4) without re-deriving wall time at append time.
    pub receive_timestamp_iso: String,
    pub speaker: Option<SpeakerInfo>,
    pub confidence: Option<f32>,
}

/// Outbound envelope shape for bot-registered ingress connections (§6.1).
#[derive(Debug, Serialize)]
pub struct TranscriptEnvelope {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: TranscriptEnvelopeData,
}

#[derive(Debug, Serialize)]
pub struct TranscriptEnvelopeData {
    pub text: String,
    #[serde(rename = "isFinal")]
    pub is_final: bool,
    #[serde(rename = "startTime")]
    pub start_time: u64,
    #[serde(rename = "endTime")]
    pub end_time: u64,
}

impl TranscriptEvent {
    /// Builds the outbound JSON envelope. The Adapter contract (§4.3) does
    /// not expose provider-side utterance timing, so start/end both use the
    /// event's receive timestamp.
    pub fn to_envelope(&self) -> TranscriptEnvelope {
        TranscriptEnvelope {
            kind: "transcription",
            data: TranscriptEnvelopeData {
                text: self.text.clone(),
                is_final: self.is_final,
                start_time: self.receive_timestamp,
                end_time: self.receive_timestamp,
            },
        }
    }
}

/// Routes transcript events to their three subscriber kinds.
pub struct TranscriptRouter {
    session_id: Uuid,
    bot_tx: broadcast::Sender<TranscriptEvent>,
    events: Arc<dyn EventEmitter>,
    /// `None` when transcript journaling is disabled (§6.4
    /// `transcript_logging_enabled: false`): dispatch and finalize both
    /// become no-ops for persistence while still reaching bot subscribers
    /// and the observer emitter.
    journal_tx: Option<mpsc::UnboundedSender<JournalCommand>>,
    clock: Arc<dyn Clock>,
}

impl TranscriptRouter {
    pub fn new(
        session_id: Uuid,
        events: Arc<dyn EventEmitter>,
        journal_tx: Option<mpsc::UnboundedSender<JournalCommand>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (bot_tx, _) = broadcast::channel(BOT_CHANNEL_CAPACITY);
        Self {
            session_id,
            bot_tx,
            events,
            journal_tx,
            clock,
        }
    }

    /// Subscribes a bot-registered ingress connection to the transcript
    /// stream.
    pub fn subscribe_bot(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.bot_tx.subscribe()
    }

    /// Builds a `TranscriptEvent` from a provider message and the current
    /// speaker snapshot, then dispatches it: the journal append is enqueued
    /// before any subscriber delivery is attempted (invariant 3).
    pub fn dispatch(
        &self,
        provider_event: ProviderTranscript,
        speaker: Option<SpeakerInfo>,
    ) -> TranscriptEvent {
        let event = TranscriptEvent {
            text: provider_event.text,
            is_final: provider_event.is_final,
            receive_timestamp: self.clock.now_millis(),
            receive_timestamp_iso: self.clock.now_iso(),
            speaker,
            confidence: provider_event.confidence,
        };

        if let Some(journal_tx) = &self.journal_tx {
            if journal_tx.send(JournalCommand::Append(event.clone())).is_err() {
                log::error!(
                    "[Sink] Session {}: journal writer gone, event not persisted",
                    self.session_id
                );
            }
        }

        self.events.emit_transcript(TranscriptBroadcast {
            session_id: self.session_id,
            text: event.text.clone(),
            is_final: event.is_final,
            timestamp: event.receive_timestamp,
        });

        if let Err(e) = self.bot_tx.send(event.clone()) {
            log::trace!(
                "[Sink] Session {}: no bot subscribers: {}",
                self.session_id,
                e
            );
        }

        event
    }

    /// Requests the journal flush its final artifacts and waits for
    /// acknowledgment. Called once, during `Draining`, before the session
    /// transitions to `Terminated`. A no-op when journaling is disabled.
    pub async fn finalize_journal(&self) {
        let Some(journal_tx) = &self.journal_tx else {
            return;
        };
        let (ack_tx, ack_rx) = oneshot::channel();
        if journal_tx.send(JournalCommand::Finalize(ack_tx)).is_err() {
            log::warn!(
                "[Sink] Session {}: journal writer already gone at finalize",
                self.session_id
            );
            return;
        }
        let _ = ack_rx.await;
    }
}
