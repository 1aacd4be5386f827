//! Playable segments and the fade window shared by every segment.
//!
//! A segment's PCM buffer is laid out as a sine fade-in over the first
//! `fade_len` samples, a flat middle, and a cosine fade-out over the last
//! `fade_len` samples. Summing one segment's fade-out with the next
//! segment's fade-in at the same offset is a constant-power crossfade.

use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Largest per-segment amplitude after volume scaling.
///
/// Two crossfading segments can sum to √2 times their individual peak,
/// so the ceiling sits at full scale / √2.
pub const CLIP_THRESHOLD: f32 = i16::MAX as f32 * FRAC_1_SQRT_2;

/// Amplitude a pioneer segment's peak is scaled to.
pub const BASE_AMPLITUDE: f32 = 0.85 * CLIP_THRESHOLD;

/// Volume factor used before any segment, and for segments with zero peak.
pub const DEFAULT_VOLUME_FACTOR: f32 = 1.0;

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(0);

/// Peak absolute amplitude of a float buffer.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}

/// Gain that maps `peak` onto [`BASE_AMPLITUDE`].
pub fn volume_factor_for_peak(peak: f32) -> f32 {
    if peak > f32::MIN_POSITIVE {
        BASE_AMPLITUDE / peak
    } else {
        DEFAULT_VOLUME_FACTOR
    }
}

/// Fade-in gain at offset `j` of a `fade_len` region.
#[inline]
pub fn fade_in_gain(j: usize, fade_len: usize) -> f32 {
    (FRAC_PI_2 * (j as f32 + 0.5) / fade_len as f32).sin()
}

/// Fade-out gain at offset `j` of a `fade_len` region.
#[inline]
pub fn fade_out_gain(j: usize, fade_len: usize) -> f32 {
    (FRAC_PI_2 * (j as f32 + 0.5) / fade_len as f32).cos()
}

/// Windowed, volume-scaled PCM ready for the mixer.
#[derive(Debug)]
pub struct Segment {
    id: u64,
    pcm: Box<[i16]>,
    fade_len: usize,
    played: AtomicBool,
}

impl Segment {
    /// Scale `samples` by `volume_factor`, apply the fade window and quantize.
    ///
    /// # Panics
    /// Panics if the buffer cannot hold a fade-in and a fade-out.
    pub fn render(samples: &[f32], volume_factor: f32, fade_len: usize) -> Self {
        let len = samples.len();
        assert!(
            fade_len > 0 && len >= 2 * fade_len,
            "segment of {len} samples cannot hold two {fade_len}-sample fades"
        );

        let fade_out_start = len - fade_len;
        let pcm = samples
            .iter()
            .enumerate()
            .map(|(i, &s)| {
                let window = if i < fade_len {
                    fade_in_gain(i, fade_len)
                } else if i >= fade_out_start {
                    fade_out_gain(i - fade_out_start, fade_len)
                } else {
                    1.0
                };
                quantize(s * volume_factor * window)
            })
            .collect();

        Self {
            id: NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed),
            pcm,
            fade_len,
            played: AtomicBool::new(false),
        }
    }

    /// Same as [`render`](Self::render), keeping the "ever played" tag of a predecessor.
    pub fn rerender(samples: &[f32], volume_factor: f32, fade_len: usize, played: bool) -> Self {
        let segment = Self::render(samples, volume_factor, fade_len);
        segment.played.store(played, Ordering::Release);
        segment
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn pcm(&self) -> &[i16] {
        &self.pcm
    }

    pub fn len(&self) -> usize {
        self.pcm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    pub fn fade_len(&self) -> usize {
        self.fade_len
    }

    /// Offset of the first fade-out sample.
    pub fn fade_out_start(&self) -> usize {
        self.pcm.len() - self.fade_len
    }

    pub fn was_played(&self) -> bool {
        self.played.load(Ordering::Acquire)
    }

    pub fn mark_played(&self) {
        self.played.store(true, Ordering::Release);
    }
}

#[inline]
fn quantize(value: f32) -> i16 {
    value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_crossfade_is_constant_power() {
        let fade_len = 2048;
        for j in 0..fade_len {
            let a = fade_out_gain(j, fade_len);
            let b = fade_in_gain(j, fade_len);
            assert_relative_eq!(a * a + b * b, 1.0, epsilon = 1e-5);
            assert!(a + b <= std::f32::consts::SQRT_2 + 1e-5);
            assert!(a >= 0.0 && b >= 0.0);
        }
    }

    #[test]
    fn test_render_window_shape() {
        let samples = vec![1.0f32; 64];
        let segment = Segment::render(&samples, 1000.0, 16);
        let pcm = segment.pcm();

        assert_eq!(segment.len(), 64);
        assert_eq!(segment.fade_out_start(), 48);
        assert!(pcm[0] < 100);
        assert!(pcm[..16].windows(2).all(|w| w[1] >= w[0]));
        assert!(pcm[16..48].iter().all(|&s| s == 1000));
        assert!(pcm[48..].windows(2).all(|w| w[1] <= w[0]));
        assert!(pcm[63] < 100);
    }

    #[test]
    fn test_render_clamps() {
        let samples = vec![-1.0f32; 8];
        let segment = Segment::render(&samples, 1.0e6, 2);
        assert!(segment.pcm()[2..6].iter().all(|&s| s == i16::MIN));
    }

    #[test]
    #[should_panic]
    fn test_render_rejects_short_buffer() {
        let _ = Segment::render(&[0.0; 10], 1.0, 6);
    }

    #[test]
    fn test_played_tag() {
        let segment = Segment::render(&[0.5; 32], 10.0, 4);
        assert!(!segment.was_played());
        segment.mark_played();
        assert!(segment.was_played());

        let again = Segment::rerender(&[0.5; 32], 5.0, 4, true);
        assert!(again.was_played());
        assert_ne!(again.id(), segment.id());
    }

    #[test]
    fn test_volume_factor() {
        assert_relative_eq!(volume_factor_for_peak(BASE_AMPLITUDE), 1.0);
        assert_relative_eq!(volume_factor_for_peak(BASE_AMPLITUDE / 4.0), 4.0);
        assert_eq!(volume_factor_for_peak(0.0), DEFAULT_VOLUME_FACTOR);
        assert_eq!(peak_amplitude(&[0.1, -0.7, 0.3]), 0.7);
    }
}
