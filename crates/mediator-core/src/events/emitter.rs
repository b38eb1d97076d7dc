//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than a concrete
//! broadcast channel, enabling testing and alternative transports.

use super::{SessionEvent, SpeakerEvent, TranscriptBroadcast};

/// Trait for emitting domain events without knowledge of transport.
pub trait EventEmitter: Send + Sync {
    /// Emits a session lifecycle event.
    fn emit_session(&self, event: SessionEvent);

    /// Emits a speaker-change event.
    fn emit_speaker(&self, event: SpeakerEvent);

    /// Emits a transcript event to the local observer.
    fn emit_transcript(&self, event: TranscriptBroadcast);
}

/// No-op emitter for testing or when no local observer is attached.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_session(&self, _event: SessionEvent) {}
    fn emit_speaker(&self, _event: SpeakerEvent) {}
    fn emit_transcript(&self, _event: TranscriptBroadcast) {}
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level via `tracing`, mirroring the separation
/// between the binary's `log` facade and the library's `tracing` facade.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_session(&self, event: SessionEvent) {
        tracing::debug!(?event, "session_event");
    }

    fn emit_speaker(&self, event: SpeakerEvent) {
        tracing::debug!(?event, "speaker_event");
    }

    fn emit_transcript(&self, event: TranscriptBroadcast) {
        tracing::debug!(?event, "transcript_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    struct CountingEventEmitter {
        session_count: AtomicUsize,
        speaker_count: AtomicUsize,
    }

    impl CountingEventEmitter {
        fn new() -> Self {
            Self {
                session_count: AtomicUsize::new(0),
                speaker_count: AtomicUsize::new(0),
            }
        }
    }

    impl EventEmitter for CountingEventEmitter {
        fn emit_session(&self, _event: SessionEvent) {
            self.session_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_speaker(&self, _event: SpeakerEvent) {
            self.speaker_count.fetch_add(1, Ordering::SeqCst);
        }

        fn emit_transcript(&self, _event: TranscriptBroadcast) {}
    }

    #[test]
    fn counting_emitter_tracks_events() {
        let emitter = Arc::new(CountingEventEmitter::new());
        let session_id = Uuid::nil();

        emitter.emit_session(SessionEvent::Created {
            session_id,
            timestamp: 0,
        });
        emitter.emit_session(SessionEvent::Terminated {
            session_id,
            timestamp: 1,
        });
        emitter.emit_speaker(SpeakerEvent {
            session_id,
            speaker_name: "Alice".into(),
            timestamp: 0,
        });

        assert_eq!(emitter.session_count.load(Ordering::SeqCst), 2);
        assert_eq!(emitter.speaker_count.load(Ordering::SeqCst), 1);
    }
}
