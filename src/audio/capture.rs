//! Microphone capture for the realtime voice session.
//!
//! Captures from the default input device at its native configuration,
//! downmixes to mono, resamples to the 16 kHz wire rate, and pushes
//! fixed-size frames into a channel as soon as they fill.

use crate::audio::codec::INPUT_SAMPLE_RATE;
use crate::audio::resample::StreamResampler;
use crate::{EngenheiroError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Accumulates samples into fixed-size frames
#[derive(Debug)]
pub(crate) struct FrameChunker {
    frame_size: usize,
    pending: Vec<f32>,
}

impl FrameChunker {
    pub(crate) fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size),
        }
    }

    pub(crate) fn push(&mut self, samples: &[f32]) -> Vec<Vec<f32>> {
        let mut frames = Vec::new();
        for &sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.frame_size {
                frames.push(std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.frame_size),
                ));
            }
        }
        frames
    }
}

/// Captures microphone audio and emits 16 kHz mono frames
pub struct MicrophoneCapture {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    is_capturing: Arc<Mutex<bool>>,
}

impl MicrophoneCapture {
    /// Open the default input device.
    ///
    /// Fails with an `AudioDeviceError` when no device is available or
    /// permission is denied; the caller surfaces this once, no retry.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| EngenheiroError::AudioDeviceError("No input device available".into()))?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| {
                EngenheiroError::AudioDeviceError(format!("Failed to get input config: {}", e))
            })?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            is_capturing: Arc::new(Mutex::new(false)),
        })
    }

    /// Start capturing. Each filled frame of `frame_size` samples at
    /// 16 kHz mono is sent through `frame_tx` as soon as it is produced.
    pub fn start(&mut self, frame_tx: Sender<Vec<f32>>, frame_size: usize) -> Result<()> {
        if *self.is_capturing.lock() {
            warn!("Already capturing");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let is_capturing = Arc::clone(&self.is_capturing);
        let mut resampler = StreamResampler::new(self.config.sample_rate.0, INPUT_SAMPLE_RATE)?;
        let mut chunker = FrameChunker::new(frame_size);

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !*is_capturing.lock() {
                        return;
                    }

                    // Average all channels to mono
                    let mono: Vec<f32> = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    let resampled = match resampler.process(&mono) {
                        Ok(samples) => samples,
                        Err(e) => {
                            error!("Resampling failed: {}", e);
                            return;
                        }
                    };
                    for frame in chunker.push(&resampled) {
                        if let Err(e) = frame_tx.try_send(frame) {
                            debug!("Failed to send capture frame: {}", e);
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                EngenheiroError::AudioDeviceError(format!("Failed to build input stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            EngenheiroError::AudioDeviceError(format!("Failed to start input stream: {}", e))
        })?;

        *self.is_capturing.lock() = true;
        self.stream = Some(stream);

        info!("Started microphone capture");
        Ok(())
    }

    /// Stop capturing; synchronous and idempotent
    pub fn stop(&mut self) {
        *self.is_capturing.lock() = false;

        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped microphone capture");
        }
    }

    pub fn is_capturing(&self) -> bool {
        *self.is_capturing.lock()
    }
}

impl Drop for MicrophoneCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
