pub mod codec;
pub mod resample;
pub mod scheduler;

#[cfg(feature = "audio-io")]
pub mod capture;
#[cfg(feature = "audio-io")]
pub mod playback;

#[cfg(feature = "audio-io")]
pub use capture::MicrophoneCapture;
#[cfg(feature = "audio-io")]
pub use playback::{PlaybackHandle, PlaybackSink};
pub use scheduler::{OutputClock, PlaybackScheduler, ScheduledSource};
