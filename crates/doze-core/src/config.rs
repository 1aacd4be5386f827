//! Mixer and playback configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the mixer/crossfader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Crossfade length in samples; also the fade-in/out length of every segment.
    pub fade_len: usize,
    /// Mono frames rendered per buffer fill.
    pub buffer_frames: usize,
    /// Gain applied while ducked.
    pub duck_gain: f32,
    /// Ramp time when the duck level changes.
    pub duck_ramp_secs: f32,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            fade_len: 2048,
            buffer_frames: 2048,
            duck_gain: 0.2,
            duck_ramp_secs: 0.05,
        }
    }
}

impl MixerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fade_len == 0 {
            return Err(Error::InvalidConfig("fade_len must be non-zero".into()));
        }
        if self.buffer_frames == 0 {
            return Err(Error::InvalidConfig("buffer_frames must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.duck_gain) {
            return Err(Error::InvalidConfig(format!(
                "duck_gain {} out of range (0-1)",
                self.duck_gain
            )));
        }
        if self.duck_ramp_secs < 0.0 {
            return Err(Error::InvalidConfig("duck_ramp_secs must be >= 0".into()));
        }
        Ok(())
    }
}

/// Configuration for the playback driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Output device index; `None` picks the host default.
    pub device_index: Option<usize>,
    /// Attempts to open and start the device before giving up.
    pub start_attempts: u32,
    /// Pause between attempts.
    pub retry_delay_ms: u64,
    /// Raise the playback thread to maximum priority.
    pub realtime_priority: bool,
    /// Device ring buffer capacity in frames.
    pub ring_frames: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device_index: None,
            start_attempts: 3,
            retry_delay_ms: 100,
            realtime_priority: true,
            ring_frames: 8192,
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_attempts == 0 {
            return Err(Error::InvalidConfig("start_attempts must be >= 1".into()));
        }
        if self.ring_frames == 0 {
            return Err(Error::InvalidConfig("ring_frames must be non-zero".into()));
        }
        Ok(())
    }
}
