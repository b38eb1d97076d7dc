//! The Adapter capability set every STT provider implements.

use async_trait::async_trait;
use thiserror::Error;

/// Options negotiated at `open`. The core asserts these to the provider; it
/// does not resample or transcode to match a provider's preference.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub language: String,
    pub interim_results: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sample_rate_hz: 16_000,
            channels: 1,
            language: "en".to_string(),
            interim_results: true,
        }
    }
}

/// A provider-produced transcript message, before the orchestrator attaches
/// a speaker snapshot and receive timestamp to form a full `TranscriptEvent`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderTranscript {
    pub text: String,
    pub is_final: bool,
    pub confidence: Option<f32>,
}

/// `open` failed: fatal for the session (§4.3, §7).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct InitError(pub String);

/// `send_audio` failed: transient, logged and dropped, no retry.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// An error surfaced from the provider's event stream, or the provider
/// closing before drain.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("{0}")]
    Message(String),
    #[error("provider closed the stream")]
    Closed,
}

/// Opens provider sessions. One adapter implementation per STT provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Opens a new streaming session. Called exactly once per mediator
    /// session, in response to the orchestrator's `StartBridge` command.
    async fn open(&self, opts: SessionOptions) -> Result<Box<dyn ProviderSession>, InitError>;

    /// Identifies the adapter in logs and error messages.
    fn provider_id(&self) -> &'static str;
}

/// A live connection to a provider, returned by `open`.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Forwards one audio frame. Non-blocking from the caller's
    /// perspective; implementations may coalesce frames internally.
    async fn send_audio(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Awaits the next transcript event. Returns `None` when the provider
    /// has closed the stream (the `Closed` lifecycle state in §4.3).
    async fn next_event(&mut self) -> Option<Result<ProviderTranscript, ProviderError>>;

    /// Half-close: flushes in-flight audio, then waits for the provider to
    /// acknowledge close. Callers apply their own bounded timeout.
    async fn close(&mut self) -> Result<(), ProviderError>;
}
