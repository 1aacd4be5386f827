//! Linear gain ramp for zipper-free duck/silence transitions.
//!
//! # Example
//!
//! ```
//! use doze_core::SmoothedGain;
//!
//! // 20ms ramp at 44.1kHz
//! let mut gain = SmoothedGain::new(1.0, 0.020, 44100.0);
//! gain.set_target(0.2);
//!
//! # let mut buffer = [0.5f32; 512];
//! gain.apply(&mut buffer);
//! ```

/// Gain that walks linearly toward its target over a fixed number of samples.
#[derive(Debug, Clone)]
pub struct SmoothedGain {
    current: f32,
    target: f32,
    step: f32,
    samples_remaining: u32,
    smooth_samples: u32,
}

impl SmoothedGain {
    pub fn new(initial: f32, smooth_time_secs: f32, sample_rate: f32) -> Self {
        let smooth_samples = (smooth_time_secs * sample_rate).max(1.0) as u32;

        Self {
            current: initial,
            target: initial,
            step: 0.0,
            samples_remaining: 0,
            smooth_samples,
        }
    }

    #[inline]
    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() < f32::EPSILON {
            return;
        }

        self.target = target;
        self.samples_remaining = self.smooth_samples;
        self.step = (self.target - self.current) / self.samples_remaining as f32;
    }

    #[inline]
    pub fn next_gain(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.step;
            self.samples_remaining -= 1;

            // Snap to target to avoid drift
            if self.samples_remaining == 0 {
                self.current = self.target;
            }
        }

        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    #[inline]
    pub fn is_smoothing(&self) -> bool {
        self.samples_remaining > 0
    }

    pub fn apply(&mut self, buffer: &mut [f32]) {
        if !self.is_smoothing() {
            if self.current != 1.0 {
                let gain = self.current;
                buffer.iter_mut().for_each(|s| *s *= gain);
            }
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.next_gain();
        }
    }
}
