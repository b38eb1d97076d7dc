//! Session Orchestrator: the state machine that ties Ingress, Bridge, and
//! Sink together for one meeting.
//!
//! The orchestrator never calls into the Bridge or Sink directly — per the
//! "cyclic wiring" design note, commands flow down through
//! [`OrchestratorCommand`] on an unbounded channel that the bootstrap wires
//! to the bridge task, and events flow back up through the ordinary
//! `Session` fields plus [`crate::events::EventEmitter`]. This keeps the two
//! sides decoupled: the orchestrator only needs a sender, the bridge task
//! only needs a receiver.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::events::{EventEmitter, SessionEvent, SpeakerEvent};
use crate::lifecycle::Lifecycle;
use crate::runtime::TaskSpawner;

use super::{Session, SessionMode, SessionState, SpeakerInfo};

/// Default grace window between a fatal provider error and teardown, giving
/// observers a chance to display the error (§4.1).
const DEFAULT_FATAL_ERROR_GRACE: Duration = Duration::from_secs(3);

/// Commands sent from the orchestrator down to the Provider Bridge task.
#[derive(Debug, Clone)]
pub enum OrchestratorCommand {
    /// Open the provider connection for this session.
    StartBridge,
    /// Begin half-close of the provider connection.
    CloseBridge,
}

/// The subset of control-plane signals that affect the state machine.
/// Everything else in the closed webhook event set is observational and is
/// not represented here (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// `bot.status_change` with status code `in_call_not_recording`.
    InCallNotRecording,
    /// `bot.recording_permission_denied`.
    RecordingPermissionDenied,
    /// `meeting.ended`.
    MeetingEnded,
}

/// Drives the Session Orchestrator state machine.
pub struct SessionOrchestrator {
    session: Arc<Session>,
    commands: mpsc::UnboundedSender<OrchestratorCommand>,
    events: Arc<dyn EventEmitter>,
    clock: Arc<dyn Clock>,
    spawner: Arc<dyn TaskSpawner>,
    lifecycle: Arc<dyn Lifecycle>,
    cancel: CancellationToken,
    fatal_error_grace: Duration,
    teardown_started: AtomicBool,
    fatal: AtomicBool,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<Session>,
        commands: mpsc::UnboundedSender<OrchestratorCommand>,
        events: Arc<dyn EventEmitter>,
        clock: Arc<dyn Clock>,
        spawner: Arc<dyn TaskSpawner>,
        lifecycle: Arc<dyn Lifecycle>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session,
            commands,
            events,
            clock,
            spawner,
            lifecycle,
            cancel,
            fatal_error_grace: DEFAULT_FATAL_ERROR_GRACE,
            teardown_started: AtomicBool::new(false),
            fatal: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub fn with_fatal_error_grace(mut self, grace: Duration) -> Self {
        self.fatal_error_grace = grace;
        self
    }

    /// The session this orchestrator drives.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Cancellation token observed by per-session tasks (ingress readers,
    /// bridge loops, journal writer) to unwind promptly.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn transition(&self, to: SessionState) {
        let from = self.session.set_state(to);
        if from == to {
            return;
        }
        log::info!(
            "[Orchestrator] Session {} {} -> {}",
            self.session.id,
            from.as_str(),
            to.as_str()
        );
        self.events.emit_session(SessionEvent::StateChanged {
            session_id: self.session.id,
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            timestamp: self.clock.now_millis(),
        });
    }

    /// Idle -> AwaitingIngress, called once when the server starts accepting
    /// connections for this session's slot.
    pub fn start(&self) {
        self.transition(SessionState::AwaitingIngress);
    }

    /// First (or subsequent) ingress connection accepted.
    ///
    /// Only the first connection drives a state transition; later
    /// connections during `Streaming` merely add a subscriber (§8 boundary
    /// behavior: reconnection does not reset the session).
    pub fn handle_ingress_connected(&self) {
        let count = self.session.add_ingress_connection();
        if count != 1 || self.session.state() != SessionState::AwaitingIngress {
            return;
        }

        self.events.emit_session(SessionEvent::Created {
            session_id: self.session.id,
            timestamp: self.clock.now_millis(),
        });

        match self.session.mode {
            SessionMode::Local => {
                self.transition(SessionState::Streaming);
                self.request_bridge_start();
            }
            SessionMode::Remote => {
                self.transition(SessionState::AwaitingGate);
            }
        }
    }

    /// An ingress connection closed. When the last one closes during
    /// `Streaming`, the session begins draining.
    pub fn handle_ingress_disconnected(&self) {
        let remaining = self.session.remove_ingress_connection();
        if remaining == 0 && self.session.state() == SessionState::Streaming {
            self.begin_draining();
        }
    }

    /// A control-plane signal relevant to the state machine arrived.
    pub fn handle_control_signal(&self, signal: ControlSignal) {
        match (self.session.state(), signal) {
            (SessionState::AwaitingGate, ControlSignal::InCallNotRecording) => {
                self.session.open_gate();
                self.transition(SessionState::Streaming);
                self.request_bridge_start();
            }
            (
                SessionState::AwaitingGate,
                ControlSignal::RecordingPermissionDenied | ControlSignal::MeetingEnded,
            ) => {
                // No bridge was ever started; proceed straight to teardown.
                self.begin_draining();
            }
            (SessionState::Streaming, ControlSignal::MeetingEnded) => {
                self.begin_draining();
            }
            _ => {}
        }
    }

    /// A speaker-metadata frame was classified by Audio Ingress.
    ///
    /// Returns `true` if a speaker-change signal should be surfaced (a
    /// rising edge with a different name than before).
    pub fn handle_speaker_info(&self, info: SpeakerInfo) -> bool {
        let changed = self.session.apply_speaker_info(info.clone());
        if changed {
            self.events.emit_speaker(SpeakerEvent {
                session_id: self.session.id,
                speaker_name: info.name,
                timestamp: self.clock.now_millis(),
            });
        }
        changed
    }

    /// The Provider Bridge reported a fatal init failure.
    ///
    /// Publishes the error, enters `FatalError`, and schedules teardown
    /// after the grace window so observers can display the error before the
    /// session tears down and the process exits non-zero.
    pub fn handle_provider_fatal_error(&self, message: String) {
        if self.session.state() == SessionState::FatalError {
            return;
        }
        self.fatal.store(true, Ordering::SeqCst);
        let truncated: String = message.chars().take(128).collect();
        self.transition(SessionState::FatalError);
        self.events.emit_session(SessionEvent::FatalError {
            session_id: self.session.id,
            message: truncated,
            timestamp: self.clock.now_millis(),
        });

        let grace = self.fatal_error_grace;
        let session_id = self.session.id;
        let session = Arc::clone(&self.session);
        let commands = self.commands.clone();
        self.spawner.spawn(async move {
            tokio::time::sleep(grace).await;
            session.set_state(SessionState::Draining);
            log::info!(
                "[Orchestrator] Session {} draining after fatal-error grace window",
                session_id
            );
            let _ = commands.send(OrchestratorCommand::CloseBridge);
        });
    }

    /// The Provider Bridge finished closing and the journal has flushed.
    /// Terminal state; requests process exit per the error taxonomy (only
    /// configuration errors and provider init failure exit non-zero).
    pub fn handle_bridge_closed_and_flushed(&self) {
        self.transition(SessionState::Terminated);
        self.events.emit_session(SessionEvent::Terminated {
            session_id: self.session.id,
            timestamp: self.clock.now_millis(),
        });
        let exit_code = if self.fatal.load(Ordering::SeqCst) { 1 } else { 0 };
        self.lifecycle.request_shutdown(exit_code);
    }

    /// External interrupt (SIGINT/SIGTERM equivalent at the process
    /// boundary). Converges on the same draining path as every other
    /// teardown trigger (invariant 5).
    pub fn handle_external_interrupt(&self) {
        self.begin_draining();
    }

    /// Requests the Provider Bridge be opened. No-op if the command channel
    /// has no receiver (bridge task already gone).
    fn request_bridge_start(&self) {
        if self.commands.send(OrchestratorCommand::StartBridge).is_err() {
            log::warn!(
                "[Orchestrator] Session {}: bridge command channel closed before start",
                self.session.id
            );
        }
    }

    /// Begins draining exactly once, regardless of how many trigger paths
    /// call it concurrently (invariant 5, idempotent teardown).
    fn begin_draining(&self) {
        if self
            .teardown_started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.transition(SessionState::Draining);
        self.cancel.cancel();
        let _ = self.commands.send(OrchestratorCommand::CloseBridge);
    }
}
