//! Breathing amplitude wave.
//!
//! A raised-cosine cycle between full volume and the envelope's volume
//! floor. The lookup table depends only on the floor; the period sets how
//! fast the phase walks through it. When the envelope changes, the new wave
//! is built from the old wave's [`WavePhase`] so the cycle continues where
//! it was instead of jumping back to the top.

use std::f32::consts::TAU;

/// Entries in one virtual wave cycle.
const TABLE_LEN: usize = 1024;

/// Position within the wave cycle, in `[0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WavePhase(f64);

impl WavePhase {
    pub fn new(position: f64) -> Self {
        Self(position.rem_euclid(1.0))
    }

    pub fn position(&self) -> f64 {
        self.0
    }
}

/// Per-sample breathing multiplier.
#[derive(Debug, Clone)]
pub struct AmplitudeWave {
    /// `None` when the floor is 100%: the wave is constant.
    table: Option<Box<[f32]>>,
    step: f64,
    phase: f64,
    volume_floor: f32,
    period_seconds: f32,
}

impl AmplitudeWave {
    /// Build a wave, continuing from `carried` if given.
    pub fn new(
        volume_floor: f32,
        period_seconds: f32,
        sample_rate: f64,
        carried: Option<WavePhase>,
    ) -> Self {
        let floor = volume_floor.clamp(0.0, 1.0);
        let table = (floor < 1.0).then(|| {
            (0..=TABLE_LEN)
                .map(|i| {
                    let x = i as f32 / TABLE_LEN as f32;
                    floor + (1.0 - floor) * (0.5 + 0.5 * (TAU * x).cos())
                })
                .collect::<Box<[f32]>>()
        });

        let period_samples = (period_seconds as f64 * sample_rate).max(1.0);

        Self {
            table,
            step: 1.0 / period_samples,
            phase: carried.map(|p| p.position()).unwrap_or(0.0),
            volume_floor: floor,
            period_seconds,
        }
    }

    /// A wave that always returns 1.0.
    pub fn constant() -> Self {
        Self::new(1.0, 1.0, 1.0, None)
    }

    pub fn phase(&self) -> WavePhase {
        WavePhase(self.phase)
    }

    pub fn volume_floor(&self) -> f32 {
        self.volume_floor
    }

    pub fn period_seconds(&self) -> f32 {
        self.period_seconds
    }

    /// Multiplier for the current sample; advances the phase.
    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        let gain = match &self.table {
            Some(table) => {
                let pos = self.phase * TABLE_LEN as f64;
                let i = (pos as usize).min(TABLE_LEN - 1);
                let frac = (pos - i as f64) as f32;
                table[i] + (table[i + 1] - table[i]) * frac
            }
            None => 1.0,
        };

        self.phase += self.step;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        gain
    }

    /// Multiply a block in place.
    pub fn apply(&mut self, buffer: &mut [f32]) {
        if self.table.is_none() {
            self.advance(buffer.len());
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.next_gain();
        }
    }

    fn advance(&mut self, samples: usize) {
        self.phase = (self.phase + self.step * samples as f64).rem_euclid(1.0);
    }
}

impl Default for AmplitudeWave {
    fn default() -> Self {
        Self::constant()
    }
}
