//! # Doze - Spectral Noise Engine
//!
//! Synthesizes noise matching a 32-band target spectrum in the background and
//! plays it back as an endless, gapless, shuffled stream of crossfaded
//! segments, optionally "breathing" with a slow amplitude wave.
//!
//! ## Architecture
//!
//! Doze is an umbrella crate that coordinates:
//! - **doze-core** - Segment pool, leveler, shuffle selector, mixer/crossfader, playback driver
//! - **doze-synth** - Background synthesizer (band shaping, inverse cosine transform)
//!
//! ## Quick Start
//!
//! ```ignore
//! use doze::prelude::*;
//!
//! let engine = DozeEngine::builder().build()?;
//! engine.on_progress(|percent| println!("{percent}%"));
//! engine.start()?;
//!
//! // Pink-ish spectrum, breathing down to 40% every 8 seconds
//! let bands: [f32; 32] = std::array::from_fn(|i| 1.0 - i as f32 / 40.0);
//! engine.set_spectral_envelope(bands, 0.4, 8.0);
//!
//! engine.set_duck_level(DuckLevel::Duck);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - CPAL output
//! - `device` - CPAL output sink; without it, supply a sink via
//!   [`DozeEngineBuilder::sink_factory`]

/// Re-export of doze-core for direct access
pub use doze_core as core;

/// Re-export of doze-synth for direct access
pub use doze_synth as synth;

pub use doze_core::{
    AudioSink, DuckLevel, MemoryRecording, MemorySink, MixerConfig, PlaybackConfig,
    PlaybackState, SinkFormat, SinkHandle, SpectralEnvelope, StepPlan, BAND_COUNT,
};

#[cfg(feature = "device")]
pub use doze_core::CpalSink;

pub use doze_synth::SynthConfig;

mod builder;
mod config;
mod engine;
mod error;

pub use builder::DozeEngineBuilder;
pub use config::DozeConfig;
pub use engine::{DozeEngine, PROGRESS_STOPPED};
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{DozeConfig, DozeEngine, DozeEngineBuilder};

    pub use crate::{DuckLevel, SpectralEnvelope, BAND_COUNT};

    pub use crate::{AudioSink, MemorySink, SinkFormat};
}
