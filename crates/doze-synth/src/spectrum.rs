//! Mapping from transform bins to envelope bands.

use doze_core::envelope::BAND_COUNT;
use doze_core::SpectralEnvelope;
use rand::Rng;

/// Band index of every bin for one transform size.
///
/// Bin `k` of a size-`N` cosine transform sits at `k * sample_rate / 2N` Hz.
/// DC and bins outside every band map to `None`.
#[derive(Debug, Clone)]
pub struct BandLayout {
    bins: Box<[Option<u8>]>,
}

impl BandLayout {
    pub fn new(size: usize, sample_rate: f64) -> Self {
        let edges = SpectralEnvelope::band_edges_hz();
        let nyquist = sample_rate / 2.0;
        let bin_hz = sample_rate / (2.0 * size as f64);

        let bins = (0..size)
            .map(|k| {
                if k == 0 {
                    return None;
                }
                let freq = k as f64 * bin_hz;
                if freq > nyquist {
                    return None;
                }
                let above = edges.partition_point(|&edge| edge as f64 <= freq);
                (1..=BAND_COUNT)
                    .contains(&above)
                    .then(|| (above - 1) as u8)
            })
            .collect();

        Self { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn band_of(&self, bin: usize) -> Option<usize> {
        self.bins.get(bin).copied().flatten().map(usize::from)
    }

    /// Bins that fall inside some band.
    pub fn covered_bins(&self) -> usize {
        self.bins.iter().filter(|b| b.is_some()).count()
    }

    /// Fill `out` with uniform signed noise scaled by each bin's band value.
    pub fn shape<R: Rng>(&self, bands: &[f32; BAND_COUNT], rng: &mut R, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.bins.iter().map(|bin| match bin {
            Some(band) => {
                let value = bands[*band as usize];
                if value == 0.0 {
                    0.0
                } else {
                    rng.gen_range(-1.0f32..1.0) * value
                }
            }
            None => 0.0,
        }));
    }
}
