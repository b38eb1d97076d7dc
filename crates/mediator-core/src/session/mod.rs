//! Session entity, state machine, and session registry.
//!
//! A [`Session`] is created when the first Audio Ingress connection arrives
//! and is destroyed once all ingress connections have closed, the Provider
//! Bridge has closed, and persistence has flushed. [`SessionOrchestrator`]
//! drives the state machine described in the component design; [`Session`]
//! itself only holds the fields that other tasks need to read concurrently
//! (the gate flag, `current_speaker`, counters).

mod orchestrator;
mod registry;

pub use orchestrator::{ControlSignal, OrchestratorCommand, SessionOrchestrator};
pub use registry::SessionRegistry;

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the ingress socket is the audio source itself (`Local`) or a
/// remote bot whose recording permission gates forwarding (`Remote`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Local,
    Remote,
}

impl SessionMode {
    /// Whether the gate starts open for this mode.
    pub fn gate_open_by_default(self) -> bool {
        matches!(self, SessionMode::Local)
    }
}

/// Session Orchestrator state machine states (component design §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    AwaitingIngress,
    AwaitingGate,
    Streaming,
    Draining,
    Terminated,
    /// Sink state entered on an unrecoverable provider error.
    FatalError,
}

impl SessionState {
    /// Human-readable tag for logging, mirroring the bracketed component tags.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::AwaitingIngress => "AwaitingIngress",
            SessionState::AwaitingGate => "AwaitingGate",
            SessionState::Streaming => "Streaming",
            SessionState::Draining => "Draining",
            SessionState::Terminated => "Terminated",
            SessionState::FatalError => "FatalError",
        }
    }
}

/// Negotiated PCM audio format: asserted to the provider and used for the
/// WAV header.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bit_depth: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            channels: 1,
            bit_depth: 16,
        }
    }
}

/// A speaker-metadata snapshot, derived from a `SpeakerMeta` ingress frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerInfo {
    pub name: String,
    pub id: i64,
    pub timestamp: u64,
    #[serde(rename = "isSpeaking")]
    pub is_speaking: bool,
}

/// One meeting's mediation state: audio format, mode, gate, current speaker,
/// and the counters that Audio Ingress and the Provider Bridge read and
/// increment on the hot path.
///
/// `gate_open` and `current_speaker` are single-writer (the orchestrator) /
/// multi-reader (ingress, bridge) per the concurrency model; there is no
/// lock on the audio hot path for the gate check.
pub struct Session {
    pub id: Uuid,
    pub mode: SessionMode,
    pub created_at: String,
    pub provider_id: String,
    pub audio_format: AudioFormat,
    state: RwLock<SessionState>,
    gate_open: AtomicBool,
    bridge_open: AtomicBool,
    current_speaker: RwLock<Option<SpeakerInfo>>,
    dropped_frame_count: AtomicU64,
    ingress_connection_count: AtomicUsize,
}

impl Session {
    pub fn new(
        id: Uuid,
        mode: SessionMode,
        created_at: String,
        provider_id: String,
        audio_format: AudioFormat,
    ) -> Self {
        Self {
            id,
            mode,
            created_at,
            provider_id,
            audio_format,
            state: RwLock::new(SessionState::Idle),
            gate_open: AtomicBool::new(mode.gate_open_by_default()),
            bridge_open: AtomicBool::new(false),
            current_speaker: RwLock::new(None),
            dropped_frame_count: AtomicU64::new(0),
            ingress_connection_count: AtomicUsize::new(0),
        }
    }

    /// Current orchestrator state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Sets the state and returns the previous one. Only the orchestrator
    /// should call this.
    pub(crate) fn set_state(&self, to: SessionState) -> SessionState {
        let mut guard = self.state.write();
        std::mem::replace(&mut *guard, to)
    }

    /// Whether audio frames may currently be forwarded to the Provider Bridge.
    pub fn is_gate_open(&self) -> bool {
        self.gate_open.load(Ordering::Acquire)
    }

    /// Opens the gate. Only the orchestrator should call this.
    pub(crate) fn open_gate(&self) {
        self.gate_open.store(true, Ordering::Release);
    }

    /// Whether the Provider Bridge has reported its connection open. Audio
    /// arriving before this is true must be dropped, not buffered, even if
    /// the gate is already open (§4.2, §4.3).
    pub fn is_bridge_open(&self) -> bool {
        self.bridge_open.load(Ordering::Acquire)
    }

    /// Sets whether the bridge is currently accepting audio. Only the
    /// Provider Bridge task should call this.
    pub(crate) fn set_bridge_open(&self, open: bool) {
        self.bridge_open.store(open, Ordering::Release);
    }

    /// Returns a snapshot of the current speaker, if any.
    pub fn current_speaker(&self) -> Option<SpeakerInfo> {
        self.current_speaker.read().clone()
    }

    /// Applies a speaker-metadata frame per invariant 2: `current_speaker`
    /// only changes on a rising speaking edge (`is_speaking=true` and
    /// `name` differs from the current speaker). Returns `true` if the
    /// speaker actually changed (a speaker-change signal should be raised).
    pub fn apply_speaker_info(&self, info: SpeakerInfo) -> bool {
        if !info.is_speaking {
            return false;
        }
        let mut guard = self.current_speaker.write();
        let changed = guard.as_ref().map(|s| s.name != info.name).unwrap_or(true);
        if changed {
            *guard = Some(info);
        }
        changed
    }

    /// Increments the dropped-PCM-frame counter (gate closed or bridge not
    /// yet open) and returns the new total.
    pub fn record_dropped_frame(&self) -> u64 {
        self.dropped_frame_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Current dropped-frame count.
    pub fn dropped_frame_count(&self) -> u64 {
        self.dropped_frame_count.load(Ordering::Relaxed)
    }

    /// Registers a new ingress connection, returning the new total.
    pub fn add_ingress_connection(&self) -> usize {
        self.ingress_connection_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Removes an ingress connection, returning the new total.
    pub fn remove_ingress_connection(&self) -> usize {
        self.ingress_connection_count
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1)
    }

    /// Current ingress connection count.
    pub fn ingress_connection_count(&self) -> usize {
        self.ingress_connection_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session(mode: SessionMode) -> Session {
        Session::new(
            Uuid::nil(),
            mode,
            "2026-08-01T00:00:00.000Z".into(),
            "mock".into(),
            AudioFormat::default(),
        )
    }

    #[test]
    fn local_mode_gate_starts_open() {
        let session = test_session(SessionMode::Local);
        assert!(session.is_gate_open());
    }

    #[test]
    fn remote_mode_gate_starts_closed() {
        let session = test_session(SessionMode::Remote);
        assert!(!session.is_gate_open());
        session.open_gate();
        assert!(session.is_gate_open());
    }

    #[test]
    fn speaker_info_ignores_stopping_edge() {
        let session = test_session(SessionMode::Local);
        let changed = session.apply_speaker_info(SpeakerInfo {
            name: "A".into(),
            id: 1,
            timestamp: 0,
            is_speaking: false,
        });
        assert!(!changed);
        assert!(session.current_speaker().is_none());
    }

    #[test]
    fn speaker_info_same_name_is_not_a_change() {
        let session = test_session(SessionMode::Local);
        session.apply_speaker_info(SpeakerInfo {
            name: "A".into(),
            id: 1,
            timestamp: 0,
            is_speaking: true,
        });
        let changed = session.apply_speaker_info(SpeakerInfo {
            name: "A".into(),
            id: 1,
            timestamp: 10,
            is_speaking: true,
        });
        assert!(!changed);
    }

    #[test]
    fn speaker_info_rising_edge_updates() {
        let session = test_session(SessionMode::Local);
        assert!(session.apply_speaker_info(SpeakerInfo {
            name: "A".into(),
            id: 1,
            timestamp: 0,
            is_speaking: true,
        }));
        assert!(session.apply_speaker_info(SpeakerInfo {
            name: "B".into(),
            id: 2,
            timestamp: 5,
            is_speaking: true,
        }));
        assert_eq!(session.current_speaker().unwrap().name, "B");
    }

    #[test]
    fn bridge_open_starts_false_regardless_of_mode() {
        let session = test_session(SessionMode::Local);
        assert!(!session.is_bridge_open());
        session.set_bridge_open(true);
        assert!(session.is_bridge_open());
        session.set_bridge_open(false);
        assert!(!session.is_bridge_open());
    }

    #[test]
    fn dropped_frame_counter_increments() {
        let session = test_session(SessionMode::Remote);
        assert_eq!(session.record_dropped_frame(), 1);
        assert_eq!(session.record_dropped_frame(), 2);
        assert_eq!(session.dropped_frame_count(), 2);
    }

    #[test]
    fn ingress_connection_count_tracks_add_remove() {
        let session = test_session(SessionMode::Local);
        assert_eq!(session.add_ingress_connection(), 1);
        assert_eq!(session.add_ingress_connection(), 2);
        assert_eq!(session.remove_ingress_connection(), 1);
        assert_eq!(session.ingress_connection_count(), 1);
    }
}
