//! Optional WAV recording writer (§4.6).
//!
//! When enabled, raw PCM frames are appended to an in-memory buffer for the
//! life of the session; the WAV file is produced once, on close, since the
//! header needs the final byte count.

use std::path::PathBuf;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::clock::Clock;
use crate::session::AudioFormat;
use crate::wav::{build_wav_file, recording_file_name};

/// Accumulates PCM bytes for one session and writes the WAV file on close.
pub struct RecordingWriter {
    session_id: Uuid,
    format: AudioFormat,
    output_dir: PathBuf,
    buffer: Mutex<Vec<u8>>,
}

impl RecordingWriter {
    pub fn new(session_id: Uuid, format: AudioFormat, output_dir: PathBuf) -> Self {
        Self {
            session_id,
            format,
            output_dir,
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Appends a raw PCM frame to the buffer. Accepts zero-length frames
    /// without special-casing, per the boundary behavior in §8.
    pub fn append(&self, pcm: &[u8]) {
        self.buffer.lock().extend_from_slice(pcm);
    }

    /// Writes the WAV file, creating the output directory if needed, and
    /// returns the path written to.
    pub async fn finish(&self, clock: &dyn Clock) -> std::io::Result<PathBuf> {
        let pcm = std::mem::take(&mut *self.buffer.lock());
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let file_name = recording_file_name(&clock.now_iso());
        let path = self.output_dir.join(file_name);
        let wav = build_wav_file(&pcm, self.format);
        tokio::fs::write(&path, wav).await?;
        log::info!(
            "[Wav] Session {}: wrote {} bytes to {}",
            self.session_id,
            pcm.len() + 44,
            path.display()
        );
        Ok(path)
    }
}
