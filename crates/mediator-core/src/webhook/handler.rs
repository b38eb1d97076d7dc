//! Handler table and per-session serialized dispatch for decoded
//! [`ControlEvent`]s.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex as AsyncMutex;

use crate::clock::Clock;
use crate::session::SessionOrchestrator;

use super::types::ControlEvent;

/// A registered handler: takes the decoded event, returns a future that
/// resolves once the handler's side effects (logging, forwarding to a UI
/// collaborator, etc.) have completed.
pub type HandlerFn = Arc<dyn Fn(ControlEvent) -> BoxFuture<'static, ()> + Send + Sync>;

/// Decodes, routes, and serializes webhook dispatch for one session's
/// orchestrator.
///
/// Only `bot.status_change` (code `in_call_not_recording`),
/// `bot.recording_permission_denied`, and `meeting.ended` have a
/// state-machine effect (§4.5); every other recognized event kind reaches
/// only the handler table, which exists for observability.
pub struct WebhookDispatcher {
    orchestrator: Arc<SessionOrchestrator>,
    handlers: HashMap<&'static str, HandlerFn>,
    wildcard: Option<HandlerFn>,
    /// Guards dispatch so two webhooks for this session never run their
    /// handlers concurrently, even though handlers are async (§4.5).
    lock: AsyncMutex<()>,
    pub clock: Arc<dyn Clock>,
}

impl WebhookDispatcher {
    pub fn new(orchestrator: Arc<SessionOrchestrator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            orchestrator,
            handlers: HashMap::new(),
            wildcard: None,
            lock: AsyncMutex::new(()),
            clock,
        }
    }

    /// Registers a handler for one event kind (e.g. `"bot.joined"`).
    /// Overwrites any previously registered handler for that kind.
    pub fn on(&mut self, kind: &'static str, handler: HandlerFn) {
        self.handlers.insert(kind, handler);
    }

    /// Registers the wildcard handler, invoked for every decoded event in
    /// addition to its specific handler, if any.
    pub fn on_any(&mut self, handler: HandlerFn) {
        self.wildcard = Some(handler);
    }

    /// Decodes-and-ignores path for event kinds outside the closed set
    /// (already filtered out by `ControlEvent::decode` returning `None`);
    /// dispatches everything else to its handler(s), then applies any
    /// state-machine effect.
    pub async fn dispatch(&self, event: Option<ControlEvent>) {
        let Some(event) = event else { return };
        let _guard = self.lock.lock().await;

        let kind = event.kind();
        if let Some(handler) = self.handlers.get(kind) {
            handler(event.clone()).await;
        }
        if let Some(wildcard) = &self.wildcard {
            wildcard(event.clone()).await;
        }

        if let Some(signal) = event.control_signal() {
            self.orchestrator.handle_control_signal(signal);
        }
    }
}
