//! Application bootstrap and dependency wiring.
//!
//! The composition root: the single place where the Session Orchestrator,
//! Provider Bridge, Transcript Sink, Webhook Intake, and Audio Ingress are
//! instantiated and wired together with the one-directional channels the
//! "cyclic wiring" design note calls for (§9).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::AppState;
use crate::bridge::{self, ProviderAdapter, ProviderError, ProviderSession, SessionOptions};
use crate::clock::{Clock, SystemClock};
use crate::error::{MediatorError, MediatorResult};
use crate::events::{BroadcastEventBridge, EventEmitter};
use crate::ingress::IngressContext;
use crate::lifecycle::{Lifecycle, ProcessLifecycle};
use crate::recording::RecordingWriter;
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::session::{AudioFormat, Session, SessionMode, SessionOrchestrator};
use crate::sink::{run_journal_writer, SessionJournal, TranscriptRouter};
use crate::webhook::WebhookDispatcher;

/// Recognized configuration options (§6.4), independent of how the binary
/// crate gathers them (CLI flags, a YAML file, environment overrides).
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub host: String,
    pub port: u16,
    pub mode: SessionMode,
    pub provider_id: String,
    pub provider_api_key: Option<String>,
    pub audio_format: AudioFormat,
    pub transcript_root: PathBuf,
    /// Enables the journal writer task and the per-session transcript
    /// artifacts under `transcript_root` (§6.4). When `false`, transcripts
    /// still reach bot subscribers and the observer emitter, but nothing is
    /// persisted to disk.
    pub transcript_logging_enabled: bool,
    /// When set, raw PCM is additionally captured and written as a WAV file
    /// on session close (§4.6).
    pub recording_dir: Option<PathBuf>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 4040,
            mode: SessionMode::Local,
            provider_id: "mock".into(),
            provider_api_key: None,
            audio_format: AudioFormat::default(),
            transcript_root: PathBuf::from("./transcripts"),
            transcript_logging_enabled: true,
            recording_dir: None,
        }
    }
}

/// Everything the binary crate needs to run the server and later tear it
/// down.
pub struct BootstrappedServices {
    pub app_state: AppState,
    pub orchestrator: Arc<SessionOrchestrator>,
    pub addr: std::net::SocketAddr,
    cancel: CancellationToken,
    bridge_task: JoinHandle<()>,
    journal_task: JoinHandle<()>,
}

impl BootstrappedServices {
    /// Initiates the same graceful teardown path an external interrupt
    /// would (invariant 5), then waits for the bridge and journal tasks to
    /// finish flushing before returning.
    pub async fn shutdown(self) {
        log::info!("[Bootstrap] shutdown requested");
        self.orchestrator.handle_external_interrupt();
        self.cancel.cancelled().await;
        let _ = self.bridge_task.await;
        let _ = self.journal_task.await;
        log::info!("[Bootstrap] shutdown complete");
    }
}

/// Bootstraps one session's worth of services: one process serves one
/// meeting (§5 scheduling model), so there is exactly one
/// [`Session`]/[`SessionOrchestrator`] pair per call.
pub fn bootstrap(config: BootstrapConfig) -> MediatorResult<BootstrappedServices> {
    bootstrap_with(
        config,
        Arc::new(SystemClock),
        Arc::new(ProcessLifecycle),
        create_provider_adapter,
    )
}

fn create_provider_adapter(
    provider_id: &str,
    api_key: Option<String>,
) -> MediatorResult<Box<dyn ProviderAdapter>> {
    bridge::create_adapter(provider_id, api_key)
}

/// Seam for tests: takes the clock and the adapter factory as parameters so
/// the end-to-end scenarios in `tests/` can substitute a [`crate::clock::test_support::FixedClock`]
/// and a scripted [`crate::bridge::MockAdapter`].
pub fn bootstrap_with(
    config: BootstrapConfig,
    clock: Arc<dyn Clock>,
    lifecycle: Arc<dyn Lifecycle>,
    adapter_factory: impl FnOnce(&str, Option<String>) -> MediatorResult<Box<dyn ProviderAdapter>>,
) -> MediatorResult<BootstrappedServices> {
    let adapter = adapter_factory(&config.provider_id, config.provider_api_key.clone())?;

    let session_id = clock.new_session_id();
    let session = Arc::new(Session::new(
        session_id,
        config.mode,
        clock.now_iso(),
        config.provider_id.clone(),
        config.audio_format,
    ));

    let event_bridge = Arc::new(BroadcastEventBridge::new(256));
    let events: Arc<dyn EventEmitter> = event_bridge.clone();
    let spawner: Arc<dyn TaskSpawner> = Arc::new(TokioSpawner::current());
    let cancel = CancellationToken::new();

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let orchestrator = Arc::new(SessionOrchestrator::new(
        Arc::clone(&session),
        command_tx,
        Arc::clone(&events),
        Arc::clone(&clock),
        spawner,
        lifecycle,
        cancel.clone(),
    ));
    orchestrator.start();

    let (journal_tx, journal_task) = if config.transcript_logging_enabled {
        let (journal_tx, journal_rx) = mpsc::unbounded_channel();
        let journal = SessionJournal::new(
            &config.transcript_root,
            session_id,
            config.provider_id.clone(),
            session.created_at.clone(),
            clock.now_millis(),
        );
        let journal_clock = Arc::clone(&clock);
        let journal_task = tokio::spawn(run_journal_writer(
            journal,
            journal_rx,
            move || journal_clock.now_iso(),
            {
                let journal_clock = Arc::clone(&clock);
                move || journal_clock.now_millis()
            },
        ));
        (Some(journal_tx), journal_task)
    } else {
        log::info!("[Bootstrap] transcript logging disabled, journal writer not started");
        (None, tokio::spawn(async {}))
    };

    let transcript_router = Arc::new(TranscriptRouter::new(
        session_id,
        Arc::clone(&events),
        journal_tx,
        Arc::clone(&clock),
    ));

    let recording = config.recording_dir.map(|dir| {
        Arc::new(RecordingWriter::new(session_id, config.audio_format, dir))
    });

    let (audio_tx, audio_rx) = mpsc::unbounded_channel();
    let bridge_task = tokio::spawn(run_bridge_task(
        Arc::clone(&session),
        Arc::clone(&orchestrator),
        command_rx,
        audio_rx,
        Arc::clone(&transcript_router),
        recording,
        Arc::clone(&clock),
        adapter,
    ));

    let webhook = Arc::new(WebhookDispatcher::new(Arc::clone(&orchestrator), Arc::clone(&clock)));

    let ingress = IngressContext {
        session: Arc::clone(&session),
        orchestrator: Arc::clone(&orchestrator),
        audio_tx,
        transcript_router,
    };

    let app_state = AppState { ingress, webhook };

    let addr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| MediatorError::Configuration(format!("invalid host/port: {e}")))?;

    Ok(BootstrappedServices {
        app_state,
        orchestrator,
        addr,
        cancel,
        bridge_task,
        journal_task,
    })
}

/// Drains `commands` until a `CloseBridge` arrives (or the channel closes),
/// used when the bridge never opened — e.g. `open` failed, or the gate
/// webhook denied permission before any audio flowed.
async fn wait_for_close_command(commands: &mut mpsc::UnboundedReceiver<crate::session::OrchestratorCommand>) {
    use crate::session::OrchestratorCommand;
    loop {
        match commands.recv().await {
            Some(OrchestratorCommand::CloseBridge) | None => return,
            Some(OrchestratorCommand::StartBridge) => {}
        }
    }
}

/// Drives one session's Provider Bridge: opens the provider connection on
/// `StartBridge`, forwards PCM frames as they arrive, routes transcripts
/// through the sink, and closes out on `CloseBridge` or the provider
/// ending the stream first (§4.3, §5).
///
/// `session.is_bridge_open()` only flips true once `adapter.open` resolves,
/// so ingress drops frames at the source for the two windows before that —
/// waiting for `StartBridge` and while `open` is in flight — instead of
/// this task buffering them in `audio_rx`.
async fn run_bridge_task(
    session: Arc<Session>,
    orchestrator: Arc<SessionOrchestrator>,
    mut commands: mpsc::UnboundedReceiver<crate::session::OrchestratorCommand>,
    mut audio_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    transcript_router: Arc<TranscriptRouter>,
    recording: Option<Arc<RecordingWriter>>,
    clock: Arc<dyn Clock>,
    adapter: Box<dyn ProviderAdapter>,
) {
    use crate::session::OrchestratorCommand;

    loop {
        match commands.recv().await {
            Some(OrchestratorCommand::StartBridge) => break,
            Some(OrchestratorCommand::CloseBridge) | None => {
                finish_session(&transcript_router, &recording, &clock, &orchestrator).await;
                return;
            }
        }
    }

    let options = SessionOptions {
        sample_rate_hz: session.audio_format.sample_rate_hz,
        channels: session.audio_format.channels,
        ..SessionOptions::default()
    };

    let mut provider_session: Box<dyn ProviderSession> = match adapter.open(options).await {
        Ok(session) => session,
        Err(e) => {
            log::error!("[Bridge] session {}: provider init failed: {}", session.id, e);
            orchestrator.handle_provider_fatal_error(e.0);
            wait_for_close_command(&mut commands).await;
            finish_session(&transcript_router, &recording, &clock, &orchestrator).await;
            return;
        }
    };

    session.set_bridge_open(true);
    log::info!("[Bridge] session {}: provider connection open", session.id);

    loop {
        tokio::select! {
            frame = audio_rx.recv() => {
                let Some(pcm) = frame else { continue };
                if let Some(rec) = &recording {
                    rec.append(&pcm);
                }
                if let Err(e) = provider_session.send_audio(&pcm).await {
                    log::warn!("[Bridge] session {}: send_audio failed: {}", session.id, e);
                }
            }
            event = provider_session.next_event() => {
                match event {
                    Some(Ok(transcript)) => {
                        let speaker = session.current_speaker();
                        transcript_router.dispatch(transcript, speaker);
                    }
                    Some(Err(ProviderError::Closed)) | None => {
                        log::info!("[Bridge] session {}: provider closed the stream", session.id);
                        break;
                    }
                    Some(Err(e)) => {
                        log::warn!("[Bridge] session {}: provider error: {}", session.id, e);
                    }
                }
            }
            command = commands.recv() => {
                match command {
                    Some(OrchestratorCommand::CloseBridge) | None => break,
                    Some(OrchestratorCommand::StartBridge) => {}
                }
            }
        }
    }

    session.set_bridge_open(false);
    if let Err(e) = provider_session.close().await {
        log::warn!("[Bridge] session {}: close failed: {}", session.id, e);
    }
    finish_session(&transcript_router, &recording, &clock, &orchestrator).await;
}

async fn finish_session(
    transcript_router: &TranscriptRouter,
    recording: &Option<Arc<RecordingWriter>>,
    clock: &Arc<dyn Clock>,
    orchestrator: &SessionOrchestrator,
) {
    if let Some(rec) = recording {
        if let Err(e) = rec.finish(clock.as_ref()).await {
            log::error!("[Bridge] failed writing recording: {}", e);
        }
    }
    transcript_router.finalize_journal().await;
    orchestrator.handle_bridge_closed_and_flushed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{MockAdapter, ProviderTranscript};
    use crate::clock::test_support::FixedClock;
    use crate::lifecycle::test_support::RecordingLifecycle;

    fn test_config(dir: &std::path::Path) -> BootstrapConfig {
        BootstrapConfig {
            host: "127.0.0.1".into(),
            port: 0,
            mode: SessionMode::Local,
            provider_id: "mock".into(),
            provider_api_key: None,
            audio_format: AudioFormat::default(),
            transcript_root: dir.to_path_buf(),
            transcript_logging_enabled: true,
            recording_dir: None,
        }
    }

    #[tokio::test]
    async fn bootstrap_wires_a_streaming_local_session() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::new(0, "2026-08-01T00:00:00.000Z", vec![Uuid::nil()]));
        let lifecycle = Arc::new(RecordingLifecycle::default());
        let services = bootstrap_with(test_config(dir.path()), clock, lifecycle, |_, _| {
            Ok(Box::new(MockAdapter::new().with_transcript(ProviderTranscript {
                text: "hello world".into(),
                is_final: true,
                confidence: None,
            })) as Box<dyn ProviderAdapter>)
        })
        .unwrap();

        services.orchestrator.handle_ingress_connected();
        assert_eq!(
            services.orchestrator.session().state(),
            crate::session::SessionState::Streaming
        );

        services.shutdown().await;
    }

    #[tokio::test]
    async fn disabled_transcript_logging_writes_no_session_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.transcript_logging_enabled = false;
        let clock = Arc::new(FixedClock::new(0, "2026-08-01T00:00:00.000Z", vec![Uuid::nil()]));
        let lifecycle = Arc::new(RecordingLifecycle::default());
        let services = bootstrap_with(config, clock, lifecycle, |_, _| {
            Ok(Box::new(MockAdapter::new().with_transcript(ProviderTranscript {
                text: "hello world".into(),
                is_final: true,
                confidence: None,
            })) as Box<dyn ProviderAdapter>)
        })
        .unwrap();

        services.orchestrator.handle_ingress_connected();
        services.shutdown().await;

        assert!(!dir.path().join("sessions").exists());
    }

    #[tokio::test]
    async fn bootstrap_surfaces_configuration_errors_from_the_adapter_registry() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.provider_id = "nonexistent".into();
        let clock = Arc::new(FixedClock::new(0, "2026-08-01T00:00:00.000Z", vec![Uuid::nil()]));
        let lifecycle = Arc::new(RecordingLifecycle::default());
        let err = bootstrap_with(config, clock, lifecycle, |id, key| bridge::create_adapter(id, key))
            .unwrap_err();
        assert_eq!(err.code(), "configuration_error");
    }
}
