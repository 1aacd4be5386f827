//! Segment pool, leveling, shuffling, crossfading and playback for spectral noise.
//!
//! # Primary API
//!
//! - [`SpectralEnvelope`]: 32-band target spectrum plus breathing parameters
//! - [`Leveler`]: single writer of the segment pool, keeps every segment under the clip threshold
//! - [`Mixer`]: turns the pool into a gapless crossfaded stream
//! - [`PlaybackDriver`]: pulls buffers from the mixer into an [`AudioSink`]
//!
//! # Feature-gated APIs
//!
//! - `"device"`: [`CpalSink`] for real audio output (enabled by default)

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::{MixerConfig, PlaybackConfig};

pub mod envelope;
pub use envelope::{breathing_period_from_slider, SpectralEnvelope, BAND_COUNT};

pub mod progress;
pub use progress::{Stage, StepPlan, SynthesisProgress};

pub mod segment;
pub use segment::{fade_in_gain, fade_out_gain, Segment, BASE_AMPLITUDE, CLIP_THRESHOLD};

pub mod leveler;
pub use leveler::{ChunkOutcome, Leveler, PoolUpdate};

pub mod shuffle;
pub use shuffle::ShuffleSelector;

pub mod wave;
pub use wave::{AmplitudeWave, WavePhase};

mod smooth;
pub use smooth::SmoothedGain;

pub(crate) mod lockfree;
pub use lockfree::{AtomicDuckLevel, AtomicFlag, AtomicFloat, DuckLevel};

pub mod mixer;
pub use mixer::{Mixer, MixerCommand, OutputControls, PlaybackCursor};

pub mod output;
#[cfg(feature = "device")]
pub use output::CpalSink;
pub use output::{AudioSink, MemoryRecording, MemorySink, SinkFactory, SinkFormat, SinkHandle};

pub mod playback;
pub use playback::{open_with_retry, PlaybackDriver, PlaybackState};
