//! Spectral envelope: the per-band loudness curve plus breathing parameters.
//!
//! An envelope is immutable. Every user edit produces a new value which is
//! compared against the previous one so unchanged edits cost nothing.

use crate::{Error, Result};

/// Number of equalizer bands.
pub const BAND_COUNT: usize = 32;

/// Lower edge of the first band.
pub const MIN_FREQ_HZ: f32 = 20.0;

/// Upper edge of the last band.
pub const MAX_FREQ_HZ: f32 = 20_000.0;

/// Shortest breathing period (10 ms).
pub const MIN_PERIOD_SECONDS: f32 = 0.01;

/// Longest breathing period (60 s).
pub const MAX_PERIOD_SECONDS: f32 = 60.0;

/// Target loudness per band, volume floor and breathing period.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SpectralEnvelope {
    bands: [f32; BAND_COUNT],
    volume_floor: f32,
    period_seconds: f32,
}

impl SpectralEnvelope {
    /// Build an envelope, panicking on malformed input.
    ///
    /// A malformed envelope is a broken caller contract; use
    /// [`try_new`](Self::try_new) for untrusted input.
    pub fn new(bands: [f32; BAND_COUNT], volume_floor: f32, period_seconds: f32) -> Self {
        match Self::try_new(bands, volume_floor, period_seconds) {
            Ok(envelope) => envelope,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn try_new(
        bands: [f32; BAND_COUNT],
        volume_floor: f32,
        period_seconds: f32,
    ) -> Result<Self> {
        if let Some((i, v)) = bands
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            return Err(Error::InvalidEnvelope(format!(
                "band {i} value {v} outside [0, 1]"
            )));
        }
        if !(0.0..=1.0).contains(&volume_floor) {
            return Err(Error::InvalidEnvelope(format!(
                "volume floor {volume_floor} outside [0, 1]"
            )));
        }
        if !(MIN_PERIOD_SECONDS..=MAX_PERIOD_SECONDS).contains(&period_seconds) {
            return Err(Error::InvalidEnvelope(format!(
                "breathing period {period_seconds}s outside [{MIN_PERIOD_SECONDS}, {MAX_PERIOD_SECONDS}]"
            )));
        }

        Ok(Self {
            bands,
            volume_floor,
            period_seconds,
        })
    }

    /// Build from a slice, rejecting anything but exactly [`BAND_COUNT`] bands.
    pub fn from_slice(bands: &[f32], volume_floor: f32, period_seconds: f32) -> Result<Self> {
        let bands: [f32; BAND_COUNT] = bands.try_into().map_err(|_| {
            Error::InvalidEnvelope(format!(
                "expected {BAND_COUNT} bands, got {}",
                bands.len()
            ))
        })?;
        Self::try_new(bands, volume_floor, period_seconds)
    }

    /// Every band at half loudness, no breathing.
    pub fn flat() -> Self {
        Self::new([0.5; BAND_COUNT], 1.0, 10.0)
    }

    /// All bands silent.
    pub fn silent() -> Self {
        Self::new([0.0; BAND_COUNT], 1.0, 10.0)
    }

    pub fn bands(&self) -> &[f32; BAND_COUNT] {
        &self.bands
    }

    pub fn volume_floor(&self) -> f32 {
        self.volume_floor
    }

    pub fn period_seconds(&self) -> f32 {
        self.period_seconds
    }

    /// True when the band values are bit-identical, ignoring modulation.
    ///
    /// Only spectral differences require new synthesis; floor and period
    /// changes are handled by the mixer's breathing wave.
    pub fn same_spectrum(&self, other: &Self) -> bool {
        self.bands
            .iter()
            .zip(other.bands.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }

    /// True when every band is zero.
    pub fn is_silent(&self) -> bool {
        self.bands.iter().all(|&v| v == 0.0)
    }

    /// Log-spaced band edges from [`MIN_FREQ_HZ`] to [`MAX_FREQ_HZ`].
    pub fn band_edges_hz() -> [f32; BAND_COUNT + 1] {
        let ratio = (MAX_FREQ_HZ / MIN_FREQ_HZ).ln();
        let mut edges = [0.0; BAND_COUNT + 1];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = MIN_FREQ_HZ * (ratio * i as f32 / BAND_COUNT as f32).exp();
        }
        edges
    }
}

impl PartialEq for SpectralEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.same_spectrum(other)
            && self.volume_floor.to_bits() == other.volume_floor.to_bits()
            && self.period_seconds.to_bits() == other.period_seconds.to_bits()
    }
}

impl Default for SpectralEnvelope {
    fn default() -> Self {
        Self::flat()
    }
}

/// Map a 0..=1 slider position logarithmically onto the breathing period range.
pub fn breathing_period_from_slider(position: f32) -> f32 {
    let t = position.clamp(0.0, 1.0);
    let ratio = (MAX_PERIOD_SECONDS / MIN_PERIOD_SECONDS).ln();
    (MIN_PERIOD_SECONDS * (ratio * t).exp()).clamp(MIN_PERIOD_SECONDS, MAX_PERIOD_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_valid_envelope() {
        let env = SpectralEnvelope::new([0.25; BAND_COUNT], 0.5, 2.0);
        assert_eq!(env.bands()[31], 0.25);
        assert_eq!(env.volume_floor(), 0.5);
        assert_eq!(env.period_seconds(), 2.0);
    }

    #[test]
    fn test_rejects_out_of_range_band() {
        let mut bands = [0.5; BAND_COUNT];
        bands[7] = 1.5;
        assert!(matches!(
            SpectralEnvelope::try_new(bands, 1.0, 1.0),
            Err(Error::InvalidEnvelope(_))
        ));

        bands[7] = f32::NAN;
        assert!(SpectralEnvelope::try_new(bands, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_rejects_wrong_band_count() {
        assert!(SpectralEnvelope::from_slice(&[0.5; 31], 1.0, 1.0).is_err());
        assert!(SpectralEnvelope::from_slice(&[0.5; 32], 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_rejects_bad_modulation() {
        assert!(SpectralEnvelope::try_new([0.5; BAND_COUNT], -0.1, 1.0).is_err());
        assert!(SpectralEnvelope::try_new([0.5; BAND_COUNT], 0.5, 0.001).is_err());
        assert!(SpectralEnvelope::try_new([0.5; BAND_COUNT], 0.5, 61.0).is_err());
    }

    #[test]
    #[should_panic(expected = "Invalid envelope")]
    fn test_new_panics_on_malformed_input() {
        let _ = SpectralEnvelope::new([2.0; BAND_COUNT], 1.0, 1.0);
    }

    #[test]
    fn test_equality_is_bitwise() {
        let a = SpectralEnvelope::new([0.5; BAND_COUNT], 0.3, 4.0);
        let b = SpectralEnvelope::new([0.5; BAND_COUNT], 0.3, 4.0);
        assert_eq!(a, b);

        let c = SpectralEnvelope::new([0.5; BAND_COUNT], 0.4, 4.0);
        assert_ne!(a, c);
        assert!(a.same_spectrum(&c));

        let mut bands = [0.5; BAND_COUNT];
        bands[0] = 0.5000001;
        let d = SpectralEnvelope::new(bands, 0.3, 4.0);
        assert!(!a.same_spectrum(&d));
    }

    #[test]
    fn test_band_edges() {
        let edges = SpectralEnvelope::band_edges_hz();
        assert_relative_eq!(edges[0], MIN_FREQ_HZ, epsilon = 1e-3);
        assert_relative_eq!(edges[BAND_COUNT], MAX_FREQ_HZ, max_relative = 1e-4);
        assert!(edges.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_slider_mapping() {
        assert_relative_eq!(breathing_period_from_slider(0.0), MIN_PERIOD_SECONDS);
        assert_relative_eq!(
            breathing_period_from_slider(1.0),
            MAX_PERIOD_SECONDS,
            max_relative = 1e-4
        );
        assert!(breathing_period_from_slider(0.5) > 0.5 && breathing_period_from_slider(0.5) < 1.0);
    }

    #[test]
    fn test_silent() {
        assert!(SpectralEnvelope::silent().is_silent());
        assert!(!SpectralEnvelope::flat().is_silent());
    }
}
