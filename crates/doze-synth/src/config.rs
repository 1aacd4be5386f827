//! Synthesizer configuration.

use crate::{Error, Result};
use doze_core::StepPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Samples per small (fast-feedback) segment.
    pub small_size: usize,
    /// Samples per large segment.
    pub large_size: usize,
    /// Number of steps in each stage group.
    pub plan: StepPlan,
    /// Large steps accepted before the synthesizer starts pacing itself.
    pub throttle_after_large: u32,
    /// Fraction of a large segment's playback time to pause between steps.
    pub throttle_fraction: f64,
    /// Fixed noise seed; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Lower the synthesizer thread to minimum priority.
    pub background_priority: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            small_size: 8192,
            large_size: 65536,
            plan: StepPlan::default(),
            throttle_after_large: 2,
            throttle_fraction: 0.75,
            seed: None,
            background_priority: true,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if self.small_size < 2 || self.large_size < 2 {
            return Err(Error::InvalidConfig(
                "segment sizes must be at least 2 samples".into(),
            ));
        }
        if self.plan.small_steps == 0 {
            return Err(Error::InvalidConfig("small_steps must be >= 1".into()));
        }
        if self.plan.volume_steps < 2 {
            return Err(Error::InvalidConfig(
                "volume_steps must be >= 2 (first and last volume step)".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.throttle_fraction) {
            return Err(Error::InvalidConfig(format!(
                "throttle_fraction {} out of range (0-1)",
                self.throttle_fraction
            )));
        }
        Ok(())
    }

    /// Segment length for a stage.
    pub fn size_for(&self, small: bool) -> usize {
        if small {
            self.small_size
        } else {
            self.large_size
        }
    }
}
