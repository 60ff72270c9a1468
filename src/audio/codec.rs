//! PCM16/base64 conversions for the realtime audio wire format.
//!
//! Outbound microphone frames are 16 kHz mono float blocks scaled to
//! 16-bit signed little-endian PCM and base64-encoded; inbound payloads
//! are the same encoding at 24 kHz mono.

use crate::{EngenheiroError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// MIME descriptor tagging outbound microphone frames
pub const INPUT_MIME: &str = "audio/pcm;rate=16000";

/// Capture rate the remote side expects
pub const INPUT_SAMPLE_RATE: u32 = 16_000;

/// Rate of the PCM the remote side streams back
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;

/// Convert float samples in [-1, 1] to 16-bit PCM and base64-encode.
/// Out-of-range samples are clamped. Scaling by 32768 with rounding
/// mirrors the 1/32768 decode scale, so a round trip stays within half
/// a quantization step except at exactly +1.0.
pub fn encode_frame(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let scaled = (sample.clamp(-1.0, 1.0) * 32768.0).round();
        let value = scaled.clamp(-32768.0, 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode a base64 payload of 16-bit little-endian PCM back to floats
pub fn decode_frame(payload: &str) -> Result<Vec<f32>> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| EngenheiroError::AudioDecodeError(format!("invalid base64: {}", e)))?;
    pcm_to_samples(&bytes)
}

/// Convert raw 16-bit little-endian PCM bytes to floats
pub fn pcm_to_samples(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(EngenheiroError::AudioDecodeError(format!(
            "odd PCM16 byte count: {}",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect())
}

/// Duration in seconds of a sample block at the given rate
pub fn duration_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}
