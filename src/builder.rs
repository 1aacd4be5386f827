//! Builder for configuring and constructing a `DozeEngine`.

use crate::config::DozeConfig;
use crate::{DozeEngine, Result};
use doze_core::{AudioSink, SinkFactory, StepPlan};

/// The sample rate is determined by the output sink and cannot be
/// overridden. Use `engine.format()` after starting to query it.
///
/// # Example
///
/// ```ignore
/// use doze::prelude::*;
///
/// let engine = DozeEngine::builder()
///     .fade_len(2048)
///     .start_attempts(3)
///     .build()?;
///
/// engine.start()?;
/// engine.set_spectral_envelope([0.5; 32], 0.6, 8.0);
/// ```
#[derive(Default)]
pub struct DozeEngineBuilder {
    config: DozeConfig,
    sink_factory: Option<SinkFactory>,
}

impl DozeEngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: DozeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output_device(mut self, index: usize) -> Self {
        self.config.playback.device_index = Some(index);
        self
    }

    /// Crossfade length in samples. Default: 2048
    pub fn fade_len(mut self, samples: usize) -> Self {
        self.config.mixer.fade_len = samples;
        self
    }

    /// Mono frames per buffer fill. Default: 2048
    pub fn buffer_frames(mut self, frames: usize) -> Self {
        self.config.mixer.buffer_frames = frames;
        self
    }

    /// Gain while ducked. Default: 0.2
    pub fn duck_gain(mut self, gain: f32) -> Self {
        self.config.mixer.duck_gain = gain;
        self
    }

    /// Default: 3
    pub fn start_attempts(mut self, attempts: u32) -> Self {
        self.config.playback.start_attempts = attempts;
        self
    }

    /// Default: 100
    pub fn retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.playback.retry_delay_ms = delay_ms;
        self
    }

    pub fn realtime_priority(mut self, enabled: bool) -> Self {
        self.config.playback.realtime_priority = enabled;
        self
    }

    /// Small and large segment lengths. Default: 8192 / 65536
    pub fn segment_sizes(mut self, small: usize, large: usize) -> Self {
        self.config.synth.small_size = small;
        self.config.synth.large_size = large;
        self
    }

    pub fn step_plan(mut self, plan: StepPlan) -> Self {
        self.config.synth.plan = plan;
        self
    }

    /// Fraction of a large segment's duration to pause between large steps.
    pub fn throttle_fraction(mut self, fraction: f64) -> Self {
        self.config.synth.throttle_fraction = fraction;
        self
    }

    /// Fixed seed for noise and shuffling.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.synth.seed = Some(seed);
        self
    }

    /// Open sinks with `factory` instead of the default output device.
    pub fn sink_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut() -> doze_core::Result<Box<dyn AudioSink>> + Send + 'static,
    {
        self.sink_factory = Some(Box::new(factory));
        self
    }

    pub fn build(self) -> Result<DozeEngine> {
        self.config.validate()?;

        let sink_factory = match self.sink_factory {
            Some(factory) => factory,
            None => default_sink_factory(&self.config)?,
        };

        Ok(DozeEngine::from_parts(self.config, sink_factory))
    }
}

#[cfg(feature = "device")]
fn default_sink_factory(config: &DozeConfig) -> Result<SinkFactory> {
    let device_index = config.playback.device_index;
    let ring_frames = config.playback.ring_frames;
    Ok(Box::new(move || {
        doze_core::CpalSink::open(device_index, ring_frames)
            .map(|sink| Box::new(sink) as Box<dyn AudioSink>)
    }))
}

#[cfg(not(feature = "device"))]
fn default_sink_factory(_config: &DozeConfig) -> Result<SinkFactory> {
    Err(crate::Error::InvalidConfig(
        "no sink factory given and the `device` feature is disabled".into(),
    ))
}
