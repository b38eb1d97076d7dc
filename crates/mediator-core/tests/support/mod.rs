//! Shared fixtures for the end-to-end scenarios: a fixed clock, a recording
//! lifecycle, and the bootstrap config boilerplate every scenario needs.
//!
//! Grounded in the same shape as `bootstrap.rs`'s own inline tests, lifted
//! out so the scenario file can stay focused on one flow per test.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use mediator_core::clock::test_support::FixedClock;
use mediator_core::lifecycle::test_support::RecordingLifecycle;
use mediator_core::{AudioFormat, BootstrapConfig, Clock, Lifecycle, SessionMode, SessionState};
use uuid::Uuid;

pub const FIXED_ISO: &str = "2026-08-01T00:00:00.000Z";
pub const FIXED_MILLIS: u64 = 1_785_628_800_000;

/// The session id every scenario gets, since each bootstraps exactly one
/// session and the journal directory name is derived from it.
pub fn fixed_session_id() -> Uuid {
    Uuid::nil()
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(FIXED_MILLIS, FIXED_ISO, vec![fixed_session_id()]))
}

pub fn recording_lifecycle() -> Arc<RecordingLifecycle> {
    Arc::new(RecordingLifecycle::default())
}

pub fn as_lifecycle(lifecycle: &Arc<RecordingLifecycle>) -> Arc<dyn Lifecycle> {
    lifecycle.clone()
}

pub fn test_config(transcript_root: &Path, mode: SessionMode) -> BootstrapConfig {
    BootstrapConfig {
        host: "127.0.0.1".into(),
        port: 0,
        mode,
        provider_id: "mock".into(),
        provider_api_key: None,
        audio_format: AudioFormat::default(),
        transcript_root: transcript_root.to_path_buf(),
        transcript_logging_enabled: true,
        recording_dir: None,
    }
}

/// Mirrors `SessionJournal::new`'s directory-naming scheme (first 15
/// characters of the ISO timestamp, digits only, then the session id) so
/// tests can locate the on-disk artifacts without a private field.
pub fn session_dir(transcript_root: &Path, started_at_iso: &str, session_id: Uuid) -> PathBuf {
    let stamp: String = started_at_iso
        .chars()
        .take(15)
        .filter(|c| c.is_ascii_digit())
        .collect();
    transcript_root
        .join("sessions")
        .join(format!("{stamp}_{session_id}"))
}

/// Polls `condition` until it's true or `timeout` elapses, returning
/// whether it converged. Mirrors the sleep-and-poll pattern the
/// orchestrator's own tests use to observe async state transitions.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let step = Duration::from_millis(10);
    let mut waited = Duration::ZERO;
    while waited < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    condition()
}

pub async fn wait_for_state(
    orchestrator: &mediator_core::SessionOrchestrator,
    state: SessionState,
    timeout: Duration,
) -> bool {
    wait_until(|| orchestrator.session().state() == state, timeout).await
}

pub fn pcm_frame(len: usize, fill: u8) -> Vec<u8> {
    vec![fill; len]
}
