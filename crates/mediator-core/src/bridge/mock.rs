//! In-process fake adapter, for tests and for local development without a
//! provider API key.
//!
//! Scripted via a small channel-backed queue rather than a mocking crate,
//! matching how the rest of the bridge ports are exercised.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::adapter::{
    InitError, ProviderAdapter, ProviderError, ProviderSession, ProviderTranscript,
    SessionOptions, TransportError,
};

/// What the next `open` call should do.
enum Script {
    Succeed,
    Fail(String),
}

/// A fake [`ProviderAdapter`] whose `open` outcome and emitted transcripts
/// are scripted by the test that constructs it.
pub struct MockAdapter {
    script: Script,
    events: parking_lot::Mutex<Vec<ProviderTranscript>>,
    retain_sender: bool,
    open_delay: Option<Duration>,
}

impl MockAdapter {
    /// An adapter whose `open` always succeeds.
    pub fn new() -> Self {
        Self {
            script: Script::Succeed,
            events: parking_lot::Mutex::new(Vec::new()),
            retain_sender: false,
            open_delay: None,
        }
    }

    /// An adapter whose `open` always fails with the given message,
    /// exercising the provider-init-failure path (§8, scenario 4).
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            script: Script::Fail(message.into()),
            events: parking_lot::Mutex::new(Vec::new()),
            retain_sender: false,
            open_delay: None,
        }
    }

    /// Delays `open`'s resolution by `delay`, to exercise callers that must
    /// not treat the bridge as open until the future actually resolves.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Queues a transcript event to be emitted by every session opened from
    /// this adapter, in the order queued.
    pub fn with_transcript(self, event: ProviderTranscript) -> Self {
        self.events.lock().push(event);
        self
    }

    /// Keeps the opened session's event stream open after its queued
    /// transcripts (if any) are drained, instead of closing like a
    /// provider that ended the call. Exercises teardown triggers other
    /// than "provider closed the stream first" (§8, scenario 5).
    pub fn long_lived(mut self) -> Self {
        self.retain_sender = true;
        self
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    async fn open(&self, _opts: SessionOptions) -> Result<Box<dyn ProviderSession>, InitError> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Succeed => {
                let (tx, rx) = mpsc::unbounded_channel();
                for event in self.events.lock().iter().cloned() {
                    let _ = tx.send(Ok(event));
                }
                Ok(Box::new(MockSession {
                    sent_frames: Vec::new(),
                    events: rx,
                    _retained_sender: self.retain_sender.then_some(tx),
                }))
            }
            Script::Fail(message) => Err(InitError(message.clone())),
        }
    }

    fn provider_id(&self) -> &'static str {
        "mock"
    }
}

/// A fake session backing [`MockAdapter`]. Records every frame passed to
/// `send_audio` so tests can assert on forwarding order and content.
pub struct MockSession {
    pub sent_frames: Vec<Vec<u8>>,
    events: mpsc::UnboundedReceiver<Result<ProviderTranscript, ProviderError>>,
    /// Kept alive (instead of dropped at the end of `open`) when the adapter
    /// is constructed with [`MockAdapter::long_lived`], so `next_event`
    /// blocks instead of reporting a closed stream.
    _retained_sender: Option<mpsc::UnboundedSender<Result<ProviderTranscript, ProviderError>>>,
}

#[async_trait]
impl ProviderSession for MockSession {
    async fn send_audio(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sent_frames.push(bytes.to_vec());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Result<ProviderTranscript, ProviderError>> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<(), ProviderError> {
        self.events.close();
        Ok(())
    }
}
