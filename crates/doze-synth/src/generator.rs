//! Shaped noise segments: random spectrum, band shaping, inverse transform.

use crate::spectrum::BandLayout;
use crate::transform::{FftDct, InverseTransform};
use doze_core::SpectralEnvelope;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

pub struct NoiseGenerator {
    transform: Box<dyn InverseTransform>,
    layouts: HashMap<usize, BandLayout>,
    rng: StdRng,
    sample_rate: f64,
}

impl NoiseGenerator {
    pub fn new(sample_rate: f64, seed: Option<u64>) -> Self {
        Self::with_transform(Box::new(FftDct::new()), sample_rate, seed)
    }

    pub fn with_transform(
        transform: Box<dyn InverseTransform>,
        sample_rate: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            transform,
            layouts: HashMap::new(),
            rng,
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// One time-domain segment of `size` samples matching `envelope`'s spectrum.
    ///
    /// Every call draws fresh noise, so a rejected segment can simply be
    /// generated again.
    pub fn generate(&mut self, envelope: &SpectralEnvelope, size: usize) -> Vec<f32> {
        let sample_rate = self.sample_rate;
        let layout = self
            .layouts
            .entry(size)
            .or_insert_with(|| BandLayout::new(size, sample_rate));

        let mut samples = Vec::with_capacity(size);
        layout.shape(envelope.bands(), &mut self.rng, &mut samples);
        self.transform.inverse(&mut samples);
        samples
    }
}
