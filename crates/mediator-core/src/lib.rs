//! Mediator Core - shared library for the audio-stream transcription
//! mediator.
//!
//! This crate implements the real-time mediation engine that sits between
//! a conferencing bot's audio socket and a cloud speech-to-text provider:
//! the session state machine, the inbound/outbound socket handling, the
//! transcript persistence and fan-out, and the webhook control plane that
//! ties bot lifecycle events to session state.
//!
//! # Architecture
//!
//! - [`session`]: the [`session::Session`] entity, [`session::SessionOrchestrator`]
//!   state machine, and [`session::SessionRegistry`]
//! - [`ingress`]: the inbound audio WebSocket — frame classification and
//!   gate-checked forwarding
//! - [`bridge`]: the outbound Provider Adapter contract and its
//!   implementations (Deepgram, an in-process mock)
//! - [`sink`]: the Transcript Sink & Router and the per-session journal
//! - [`webhook`]: the control-plane HTTP endpoint and the closed event set
//! - [`api`]: router construction and server startup
//! - [`bootstrap`]: the composition root wiring everything together
//! - [`events`]: the observer event bridge
//! - [`error`]: centralized error types
//! - [`clock`], [`runtime`], [`lifecycle`]: the abstraction traits that
//!   keep the above testable without a real clock, runtime, or process
//!
//! Recording (`wav`, `recording`) and the orchestrator's provider/session
//! types are re-exported at the crate root for the binary crate's
//! convenience.

#![warn(clippy::all)]

pub mod api;
pub mod bootstrap;
pub mod bridge;
pub mod clock;
pub mod error;
pub mod events;
pub mod ingress;
pub mod lifecycle;
pub mod recording;
pub mod runtime;
pub mod session;
pub mod sink;
pub mod wav;
pub mod webhook;

pub use api::{start_server, AppState, ServerError};
pub use bootstrap::{bootstrap, bootstrap_with, BootstrapConfig, BootstrappedServices};
pub use bridge::{create_adapter, ProviderAdapter, ProviderSession, ProviderTranscript};
pub use clock::{Clock, SystemClock};
pub use error::{ErrorCode, MediatorError, MediatorResult};
pub use events::{BroadcastEvent, BroadcastEventBridge, EventEmitter, LoggingEventEmitter};
pub use lifecycle::{Lifecycle, ProcessLifecycle};
pub use recording::RecordingWriter;
pub use runtime::{TaskSpawner, TokioSpawner};
pub use session::{
    AudioFormat, ControlSignal, Session, SessionMode, SessionOrchestrator, SessionRegistry,
    SessionState, SpeakerInfo,
};
pub use sink::{TranscriptEvent, TranscriptRouter};
pub use webhook::{ControlEvent, WebhookDispatcher};
