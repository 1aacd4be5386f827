//! Engine-wide configuration.

use crate::{Error, Result};
use doze_core::{MixerConfig, PlaybackConfig};
use doze_synth::SynthConfig;
use serde::{Deserialize, Serialize};

/// Synthesizer, mixer and playback settings for a [`DozeEngine`](crate::DozeEngine).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DozeConfig {
    pub synth: SynthConfig,
    pub mixer: MixerConfig,
    pub playback: PlaybackConfig,
}

impl DozeConfig {
    pub fn validate(&self) -> Result<()> {
        self.synth.validate()?;
        self.mixer.validate()?;
        self.playback.validate()?;

        let shortest = self.synth.small_size.min(self.synth.large_size);
        if shortest < 2 * self.mixer.fade_len {
            return Err(Error::InvalidConfig(format!(
                "segments of {shortest} samples cannot hold two {}-sample fades",
                self.mixer.fade_len
            )));
        }
        Ok(())
    }
}
