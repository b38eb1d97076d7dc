//! WAV file construction (§4.6).
//!
//! Unlike a live monitoring stream, a session's recording has a known
//! length once the session closes, so the header carries the real RIFF and
//! data chunk sizes rather than a sentinel for an open-ended stream.

use bytes::{BufMut, Bytes, BytesMut};

use crate::session::AudioFormat;

/// Builds a complete WAV file (44-byte header plus the captured PCM bytes)
/// for the given format. Writing N PCM bytes produces a file of length
/// N + 44.
pub fn build_wav_file(pcm: &[u8], format: AudioFormat) -> Bytes {
    let bytes_per_sample = (format.bit_depth / 8).max(1);
    let byte_rate = format.sample_rate_hz * format.channels as u32 * bytes_per_sample as u32;
    let block_align = format.channels * bytes_per_sample;
    let data_len = pcm.len() as u32;

    let mut buf = BytesMut::with_capacity(44 + pcm.len());

    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + data_len);
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1); // PCM
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate_hz);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(format.bit_depth);

    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);

    buf.freeze()
}

/// File name for a recording started at the given ISO-8601 timestamp:
/// colons and periods are replaced with hyphens to keep it filesystem-safe.
pub fn recording_file_name(iso_timestamp: &str) -> String {
    let sanitized: String = iso_timestamp
        .chars()
        .map(|c| if c == ':' || c == '.' { '-' } else { c })
        .collect();
    format!("recording_{sanitized}.wav")
}
