//! The closed webhook event set (§6.3) and its wire envelope.

use serde::Deserialize;
use serde_json::Value;

use crate::session::ControlSignal;

/// Raw envelope accepted by the webhook endpoint, before `event` is
/// validated against the closed set.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `bot.status_change`'s `status` field: either a bare code string or an
/// object carrying a code and a human-readable message.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BotStatus {
    Code(String),
    Detailed { code: String, message: Option<String> },
}

impl BotStatus {
    pub fn code(&self) -> &str {
        match self {
            BotStatus::Code(c) => c,
            BotStatus::Detailed { code, .. } => code,
        }
    }
}

/// One decoded webhook event. Every variant in the closed set (§6.3) is
/// represented even though only `StatusChange` can affect the state
/// machine — the rest are observational and exist so a wildcard handler
/// can log or surface them.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    BotJoining,
    BotInWaitingRoom,
    BotJoined,
    BotLeft,
    RecordingPermissionAllowed,
    RecordingPermissionDenied,
    RecordingStarted,
    RecordingReady { url: Option<String> },
    RecordingFailed { error: Option<String> },
    TranscriptionReady { url: Option<String> },
    TranscriptionFailed { error: Option<String> },
    MeetingEnded,
    BotStatusChange { status: BotStatus },
}

impl ControlEvent {
    /// Decodes a `(event, data)` pair against the closed set. An
    /// unrecognized kind string is accepted as `None` here so the caller
    /// can still route it to a wildcard handler instead of rejecting the
    /// request outright — only a malformed `status_change.status` field
    /// is an error, since that shape is required to interpret the event.
    pub fn decode(kind: &str, data: Value) -> Result<Option<Self>, String> {
        let event = match kind {
            "bot.joining" => Some(ControlEvent::BotJoining),
            "bot.in_waiting_room" => Some(ControlEvent::BotInWaitingRoom),
            "bot.joined" => Some(ControlEvent::BotJoined),
            "bot.left" => Some(ControlEvent::BotLeft),
            "bot.recording_permission_allowed" => Some(ControlEvent::RecordingPermissionAllowed),
            "bot.recording_permission_denied" => Some(ControlEvent::RecordingPermissionDenied),
            "recording.started" => Some(ControlEvent::RecordingStarted),
            "recording.ready" => Some(ControlEvent::RecordingReady {
                url: data.get("url").and_then(Value::as_str).map(String::from),
            }),
            "recording.failed" => Some(ControlEvent::RecordingFailed {
                error: data.get("error").and_then(Value::as_str).map(String::from),
            }),
            "transcription.ready" => Some(ControlEvent::TranscriptionReady {
                url: data.get("url").and_then(Value::as_str).map(String::from),
            }),
            "transcription.failed" => Some(ControlEvent::TranscriptionFailed {
                error: data.get("error").and_then(Value::as_str).map(String::from),
            }),
            "meeting.ended" => Some(ControlEvent::MeetingEnded),
            "bot.status_change" => {
                let status_value = data.get("status").cloned().ok_or_else(|| {
                    "bot.status_change missing \"status\" field".to_string()
                })?;
                let status: BotStatus = serde_json::from_value(status_value)
                    .map_err(|e| format!("bot.status_change.status: {e}"))?;
                Some(ControlEvent::BotStatusChange { status })
            }
            _ => None,
        };
        Ok(event)
    }

    /// The state-machine signal this event carries, if any. Per §4.5, only
    /// `bot.status_change` with code `in_call_not_recording` has a direct
    /// effect; everything else is observational.
    pub fn control_signal(&self) -> Option<ControlSignal> {
        match self {
            ControlEvent::BotStatusChange { status } if status.code() == "in_call_not_recording" => {
                Some(ControlSignal::InCallNotRecording)
            }
            ControlEvent::RecordingPermissionDenied => Some(ControlSignal::RecordingPermissionDenied),
            ControlEvent::MeetingEnded => Some(ControlSignal::MeetingEnded),
            _ => None,
        }
    }

    /// Tag used for handler-table lookup and logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlEvent::BotJoining => "bot.joining",
            ControlEvent::BotInWaitingRoom => "bot.in_waiting_room",
            ControlEvent::BotJoined => "bot.joined",
            ControlEvent::BotLeft => "bot.left",
            ControlEvent::RecordingPermissionAllowed => "bot.recording_permission_allowed",
            ControlEvent::RecordingPermissionDenied => "bot.recording_permission_denied",
            ControlEvent::RecordingStarted => "recording.started",
            ControlEvent::RecordingReady { .. } => "recording.ready",
            ControlEvent::RecordingFailed { .. } => "recording.failed",
            ControlEvent::TranscriptionReady { .. } => "transcription.ready",
            ControlEvent::TranscriptionFailed { .. } => "transcription.failed",
            ControlEvent::MeetingEnded => "meeting.ended",
            ControlEvent::BotStatusChange { .. } => "bot.status_change",
        }
    }
}
