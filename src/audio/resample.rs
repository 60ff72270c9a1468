//! Streaming sample-rate conversion built on rubato's sinc resampler.
//!
//! `SincFixedIn` consumes fixed-size chunks, so input is buffered until a
//! full chunk is available and the remainder carries over to the next
//! call. This keeps arbitrary callback block sizes working while the
//! band-limiting sinc filter prevents aliasing on downsampling.

use crate::{EngenheiroError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Frames per channel handed to rubato in one call
const CHUNK_SIZE: usize = 1024;

pub struct StreamResampler {
    resampler: Option<SincFixedIn<f32>>,
    pending: Vec<f32>,
    ratio: f64,
}

impl StreamResampler {
    /// Create a mono resampler. Equal rates become a passthrough.
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(EngenheiroError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let ratio = output_rate as f64 / input_rate as f64;
        if input_rate == output_rate {
            return Ok(Self {
                resampler: None,
                pending: Vec::new(),
                ratio,
            });
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, CHUNK_SIZE, 1).map_err(|e| {
            EngenheiroError::AudioProcessingError(format!("Failed to create resampler: {}", e))
        })?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self {
            resampler: Some(resampler),
            pending: Vec::new(),
            ratio,
        })
    }

    /// Resample a block. Output covers only the full chunks consumed so
    /// far; up to one chunk of input stays pending for the next call.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(input.to_vec());
        };

        self.pending.extend_from_slice(input);

        let mut output = Vec::new();
        while self.pending.len() >= CHUNK_SIZE {
            let chunk: Vec<f32> = self.pending.drain(..CHUNK_SIZE).collect();
            let planar = resampler.process(&[chunk], None).map_err(|e| {
                EngenheiroError::AudioProcessingError(format!("Resampling failed: {}", e))
            })?;
            output.extend_from_slice(&planar[0]);
        }

        Ok(output)
    }

    /// Drain the pending remainder by zero-padding it to a full chunk,
    /// keeping only the output that corresponds to real input.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(Vec::new());
        };
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let real_frames = self.pending.len();
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.resize(CHUNK_SIZE, 0.0);

        let planar = resampler.process(&[chunk], None).map_err(|e| {
            EngenheiroError::AudioProcessingError(format!("Resampling failed: {}", e))
        })?;

        let keep = ((real_frames as f64) * self.ratio).ceil() as usize;
        let mut tail = planar[0].clone();
        tail.truncate(keep);
        Ok(tail)
    }

    /// Drop pending input and the filter state
    pub fn reset(&mut self) {
        self.pending.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rates_rejected() {
        assert!(StreamResampler::new(0, 16_000).is_err());
        assert!(StreamResampler::new(48_000, 0).is_err());
    }

    #[test]
    fn test_identity_rate_is_passthrough() {
        let mut resampler = StreamResampler::new(16_000, 16_000).unwrap();
        let input: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(resampler.process(&input).unwrap(), input);
        assert!(resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn test_downsample_ratio_across_blocks() {
        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();

        // 48k -> 16k is 3:1; feed one second in uneven blocks
        let mut total = 0;
        for block in [4800usize, 441, 4800, 441, 37_518] {
            total += resampler.process(&vec![0.0f32; block]).unwrap().len();
        }
        total += resampler.flush().unwrap().len();

        assert!((total as i64 - 16_000).abs() <= 8, "got {}", total);
    }

    #[test]
    fn test_upsample_ratio() {
        let mut resampler = StreamResampler::new(24_000, 48_000).unwrap();
        let out = resampler.process(&vec![0.0f32; 2048]).unwrap();
        assert!((out.len() as i64 - 4096).abs() <= 8, "got {}", out.len());
    }

    #[test]
    fn test_short_block_stays_pending_until_flush() {
        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();

        assert!(resampler.process(&vec![0.5f32; 100]).unwrap().is_empty());

        let tail = resampler.flush().unwrap();
        assert!((tail.len() as i64 - 34).abs() <= 2, "got {}", tail.len());
    }

    #[test]
    fn test_downsampling_rejects_out_of_band_energy() {
        // A 12 kHz tone cannot be represented at 16 kHz output; the sinc
        // filter must attenuate it instead of folding it to 4 kHz.
        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();
        let input: Vec<f32> = (0..48_000)
            .map(|i| (i as f32 * 12_000.0 * 2.0 * std::f32::consts::PI / 48_000.0).sin())
            .collect();

        let output = resampler.process(&input).unwrap();
        // Skip the filter's startup transient
        let steady = &output[output.len() / 2..];
        let rms = (steady.iter().map(|s| s * s).sum::<f32>() / steady.len() as f32).sqrt();

        assert!(rms < 0.05, "aliased energy leaked through: rms {}", rms);
    }

    #[test]
    fn test_reset_drops_pending_input() {
        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();
        assert!(resampler.process(&vec![0.5f32; 100]).unwrap().is_empty());

        resampler.reset();
        assert!(resampler.flush().unwrap().is_empty());
    }

    #[test]
    fn test_empty_input() {
        let mut resampler = StreamResampler::new(48_000, 16_000).unwrap();
        assert!(resampler.process(&[]).unwrap().is_empty());
    }
}
