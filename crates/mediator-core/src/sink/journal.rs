//! SessionJournal: the append-only per-session transcript record (§4.4).
//!
//! Runs as its own task, fed by an unbounded channel so a slow disk never
//! back-pressures the provider's event stream. Durability is prioritized
//! over memory bounds here, unlike the bot-socket and observer fan-out.

use std::path::PathBuf;

use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::TranscriptEvent;

/// Commands accepted by the journal writer task.
pub enum JournalCommand {
    Append(TranscriptEvent),
    Finalize(oneshot::Sender<()>),
}

#[derive(Serialize)]
struct JournalRecord<'a> {
    timestamp: &'a str,
    text: &'a str,
    is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
}

#[derive(Serialize)]
struct TranscriptJson<'a> {
    session_id: Uuid,
    event_count: usize,
    final_count: usize,
    entries: Vec<JournalRecord<'a>>,
}

#[derive(Serialize)]
struct SessionInfo<'a> {
    session_id: Uuid,
    provider_id: &'a str,
    started_at: &'a str,
    ended_at: Option<&'a str>,
    duration_ms: Option<u64>,
    event_count: usize,
    final_count: usize,
}

/// Owns the on-disk artifacts for one session's transcript.
pub struct SessionJournal {
    session_id: Uuid,
    provider_id: String,
    started_at: String,
    started_at_ms: u64,
    dir: PathBuf,
    entries: Vec<TranscriptEvent>,
}

impl SessionJournal {
    /// Builds the session directory name and journal, without touching the
    /// filesystem yet (created lazily on the first append).
    pub fn new(
        transcript_root: &std::path::Path,
        session_id: Uuid,
        provider_id: String,
        started_at: String,
        started_at_ms: u64,
    ) -> Self {
        let dir_name_stamp: String = started_at
            .chars()
            .take(15)
            .filter(|c| c.is_ascii_digit())
            .collect();
        let dir = transcript_root
            .join("sessions")
            .join(format!("{dir_name_stamp}_{session_id}"));
        Self {
            session_id,
            provider_id,
            started_at,
            started_at_ms,
            dir,
            entries: Vec::new(),
        }
    }

    async fn ensure_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await
    }

    async fn append(&mut self, event: TranscriptEvent) -> std::io::Result<()> {
        self.ensure_dir().await?;

        let mut raw_log = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("raw_logs.txt"))
            .await?;
        let line = format!(
            "[{}] {}{}\n",
            event.receive_timestamp,
            if event.is_final { "FINAL " } else { "interim " },
            event.text
        );
        raw_log.write_all(line.as_bytes()).await?;

        self.entries.push(event);
        self.rewrite_transcript_json().await?;
        self.rewrite_transcript_txt().await?;
        Ok(())
    }

    async fn rewrite_transcript_json(&self) -> std::io::Result<()> {
        let entries: Vec<JournalRecord> = self
            .entries
            .iter()
            .map(|e| JournalRecord {
                timestamp: &e.receive_timestamp_iso,
                text: &e.text,
                is_final: e.is_final,
                speaker: e.speaker.as_ref().map(|s| s.name.as_str()),
                confidence: e.confidence,
            })
            .collect();
        let final_count = self.entries.iter().filter(|e| e.is_final).count();
        let doc = TranscriptJson {
            session_id: self.session_id,
            event_count: self.entries.len(),
            final_count,
            entries,
        };
        let json = serde_json::to_vec_pretty(&doc)?;
        tokio::fs::write(self.dir.join("transcript.json"), json).await
    }

    async fn rewrite_transcript_txt(&self) -> std::io::Result<()> {
        // Testable property: the final plain-text artifact equals the
        // concatenation, separated by single spaces, of the `text` fields
        // of all final events in emission order.
        let text = self
            .entries
            .iter()
            .filter(|e| e.is_final)
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        tokio::fs::write(self.dir.join("transcript.txt"), text).await
    }

    async fn finalize(&self, ended_at: &str, ended_at_ms: u64) -> std::io::Result<()> {
        self.ensure_dir().await?;
        let final_count = self.entries.iter().filter(|e| e.is_final).count();
        let info = SessionInfo {
            session_id: self.session_id,
            provider_id: &self.provider_id,
            started_at: &self.started_at,
            ended_at: Some(ended_at),
            duration_ms: Some(ended_at_ms.saturating_sub(self.started_at_ms)),
            event_count: self.entries.len(),
            final_count,
        };
        let json = serde_json::to_vec_pretty(&info)?;
        tokio::fs::write(self.dir.join("session_info.txt"), json).await
    }
}

/// Runs the journal writer task to completion. Exits when the command
/// channel closes, which happens once the router and all its clones are
/// dropped (i.e. after `Finalize` has been processed and acknowledged).
pub async fn run_journal_writer(
    mut journal: SessionJournal,
    mut commands: mpsc::UnboundedReceiver<JournalCommand>,
    now_iso: impl Fn() -> String,
    now_millis: impl Fn() -> u64,
) {
    while let Some(command) = commands.recv().await {
        match command {
            JournalCommand::Append(event) => {
                if let Err(e) = journal.append(event).await {
                    log::error!("[Journal] Session {}: append failed: {}", journal.session_id, e);
                }
            }
            JournalCommand::Finalize(ack) => {
                if let Err(e) = journal.finalize(&now_iso(), now_millis()).await {
                    log::error!(
                        "[Journal] Session {}: finalize failed: {}",
                        journal.session_id,
                        e
                    );
                }
                let _ = ack.send(());
            }
        }
    }
}
