//! Playback sink for streamed 24 kHz response audio.
//!
//! Decoded chunks are placed on the output timeline by the
//! `PlaybackScheduler` and rendered from a single sample queue; the
//! device callback is the output clock. The device stream stays with its
//! owner while a cloneable `PlaybackHandle` lets worker threads enqueue
//! and clear. `clear()` is a hard stop: the queue and every in-flight
//! source are dropped immediately.

use crate::audio::codec::{self, OUTPUT_SAMPLE_RATE};
use crate::audio::resample::StreamResampler;
use crate::audio::scheduler::{OutputClock, PlaybackScheduler, ScheduledSource};
use crate::{EngenheiroError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Output clock derived from frames actually rendered by the device
#[derive(Debug, Clone)]
struct SampleClock {
    frames_rendered: Arc<AtomicU64>,
    rate: u32,
}

impl OutputClock for SampleClock {
    fn now(&self) -> f64 {
        self.frames_rendered.load(Ordering::Relaxed) as f64 / self.rate as f64
    }
}

struct SinkShared {
    queue: Mutex<VecDeque<f32>>,
    frames_rendered: Arc<AtomicU64>,
    scheduler: Mutex<PlaybackScheduler<SampleClock>>,
    /// (end frame, source id) pairs awaiting natural completion
    in_flight: Mutex<Vec<(u64, u64)>>,
    resampler: Mutex<StreamResampler>,
    device_rate: u32,
}

impl SinkShared {
    fn enqueue(&self, samples: &[f32]) -> Result<ScheduledSource> {
        let rendered = self.resampler.lock().process(samples)?;
        let duration = codec::duration_seconds(samples.len(), OUTPUT_SAMPLE_RATE);

        let source = self.scheduler.lock().schedule(duration);
        let start_frame = (source.start * self.device_rate as f64).round() as u64;

        let mut queue = self.queue.lock();
        let write_head = self.frames_rendered.load(Ordering::Relaxed) + queue.len() as u64;
        if start_frame > write_head {
            // Pad the gap with silence so the chunk starts on schedule
            queue.extend(std::iter::repeat(0.0).take((start_frame - write_head) as usize));
        }
        queue.extend(rendered.iter().copied());
        let end_frame = self.frames_rendered.load(Ordering::Relaxed) + queue.len() as u64;
        drop(queue);

        self.in_flight.lock().push((end_frame, source.id));
        self.reap_completed();
        Ok(source)
    }

    /// Drain the resampler's pending remainder into the queue. Called at
    /// the end of a response turn so the tail is not held back waiting
    /// for a next chunk.
    fn flush(&self) -> Result<()> {
        let tail = self.resampler.lock().flush()?;
        if !tail.is_empty() {
            self.queue.lock().extend(tail.iter().copied());
        }
        Ok(())
    }

    /// Retire sources whose samples have fully left the queue
    fn reap_completed(&self) {
        let rendered = self.frames_rendered.load(Ordering::Relaxed);
        let mut in_flight = self.in_flight.lock();
        let mut scheduler = self.scheduler.lock();

        in_flight.retain(|&(end_frame, id)| {
            if rendered >= end_frame {
                scheduler.complete(id);
                false
            } else {
                true
            }
        });
    }

    fn active_sources(&self) -> usize {
        self.reap_completed();
        self.scheduler.lock().active_count()
    }

    fn clear(&self) -> usize {
        self.queue.lock().clear();
        self.in_flight.lock().clear();
        self.resampler.lock().reset();
        self.scheduler.lock().clear()
    }
}

/// Thread-safe handle to an open sink, detached from the device stream
#[derive(Clone)]
pub struct PlaybackHandle {
    shared: Arc<SinkShared>,
}

impl PlaybackHandle {
    /// Enqueue a decoded 24 kHz mono chunk for gapless sequential playback
    pub fn enqueue(&self, samples: &[f32]) -> Result<ScheduledSource> {
        self.shared.enqueue(samples)
    }

    /// Drain the resampler tail at the end of a response turn
    pub fn flush(&self) -> Result<()> {
        self.shared.flush()
    }

    /// Hard stop: drop queued audio and cancel every in-flight source.
    /// Returns how many sources were cancelled. Idempotent.
    pub fn clear(&self) -> usize {
        self.shared.clear()
    }

    /// Number of chunks scheduled or playing
    pub fn active_sources(&self) -> usize {
        self.shared.active_sources()
    }
}

pub struct PlaybackSink {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    shared: Arc<SinkShared>,
}

impl PlaybackSink {
    /// Open the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| EngenheiroError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: StreamConfig = device
            .default_output_config()
            .map_err(|e| {
                EngenheiroError::AudioDeviceError(format!("Failed to get output config: {}", e))
            })?
            .into();
        let device_rate = config.sample_rate.0;

        let frames_rendered = Arc::new(AtomicU64::new(0));
        let clock = SampleClock {
            frames_rendered: Arc::clone(&frames_rendered),
            rate: device_rate,
        };

        Ok(Self {
            device,
            config,
            stream: None,
            shared: Arc::new(SinkShared {
                queue: Mutex::new(VecDeque::new()),
                frames_rendered,
                scheduler: Mutex::new(PlaybackScheduler::new(clock)),
                in_flight: Mutex::new(Vec::new()),
                resampler: Mutex::new(StreamResampler::new(OUTPUT_SAMPLE_RATE, device_rate)?),
                device_rate,
            }),
        })
    }

    pub fn handle(&self) -> PlaybackHandle {
        PlaybackHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.device_rate
    }

    /// Start rendering. Silence plays until chunks are enqueued.
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let shared = Arc::clone(&self.shared);

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    let mut queue = shared.queue.lock();

                    for frame in 0..frames {
                        let sample = queue.pop_front().unwrap_or(0.0);
                        for channel in 0..channels {
                            data[frame * channels + channel] = sample;
                        }
                    }

                    // The clock advances whether or not anything played
                    shared
                        .frames_rendered
                        .fetch_add(frames as u64, Ordering::Relaxed);
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                EngenheiroError::AudioDeviceError(format!("Failed to build output stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            EngenheiroError::AudioDeviceError(format!("Failed to start output stream: {}", e))
        })?;

        self.stream = Some(stream);
        info!("Started playback sink at {} Hz", self.shared.device_rate);
        Ok(())
    }

    pub fn enqueue(&self, samples: &[f32]) -> Result<ScheduledSource> {
        self.shared.enqueue(samples)
    }

    pub fn flush(&self) -> Result<()> {
        self.shared.flush()
    }

    pub fn active_sources(&self) -> usize {
        self.shared.active_sources()
    }

    pub fn clear(&self) -> usize {
        self.shared.clear()
    }

    /// Stop rendering and release the device stream. Idempotent.
    pub fn shutdown(&mut self) {
        self.shared.clear();
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped playback sink");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for PlaybackSink {
    fn drop(&mut self) {
        self.shutdown();
    }
}
