//! Inverse cosine transform.
//!
//! [`FftDct`] computes an unnormalized DCT-III:
//!
//! ```text
//! x[n] = X[0]/2 + sum_{k=1}^{N-1} X[k] cos(pi k (2n + 1) / 2N)
//! ```
//!
//! by rotating each coefficient by `e^{i pi k / 2N}`, zero-padding to `2N`
//! and taking the real part of an inverse complex FFT.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Frequency-domain to time-domain kernel used by the synthesizer.
pub trait InverseTransform: Send {
    /// Replace `coefficients` with their inverse transform, in place.
    fn inverse(&mut self, coefficients: &mut [f32]);
}

struct DctKernel {
    fft: Arc<dyn Fft<f32>>,
    twiddles: Box<[Complex<f32>]>,
}

impl DctKernel {
    fn new(planner: &mut FftPlanner<f32>, n: usize) -> Self {
        let twiddles = (0..n)
            .map(|k| {
                let theta = PI * k as f64 / (2.0 * n as f64);
                Complex::new(theta.cos() as f32, theta.sin() as f32)
            })
            .collect();

        Self {
            fft: planner.plan_fft_inverse(2 * n),
            twiddles,
        }
    }
}

/// DCT-III through rustfft, with plans cached per size.
pub struct FftDct {
    planner: FftPlanner<f32>,
    kernels: HashMap<usize, DctKernel>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl FftDct {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            kernels: HashMap::new(),
            buffer: Vec::new(),
            scratch: Vec::new(),
        }
    }
}

impl Default for FftDct {
    fn default() -> Self {
        Self::new()
    }
}

impl InverseTransform for FftDct {
    fn inverse(&mut self, coefficients: &mut [f32]) {
        let n = coefficients.len();
        if n == 0 {
            return;
        }

        let planner = &mut self.planner;
        let kernel = self
            .kernels
            .entry(n)
            .or_insert_with(|| DctKernel::new(planner, n));

        self.buffer.clear();
        self.buffer.extend(
            coefficients
                .iter()
                .zip(kernel.twiddles.iter())
                .map(|(&x, &w)| w * x),
        );
        self.buffer[0] *= 0.5;
        self.buffer.resize(2 * n, Complex::new(0.0, 0.0));

        let scratch_len = kernel.fft.get_inplace_scratch_len();
        if self.scratch.len() < scratch_len {
            self.scratch.resize(scratch_len, Complex::new(0.0, 0.0));
        }
        kernel
            .fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch[..scratch_len]);

        for (out, y) in coefficients.iter_mut().zip(&self.buffer) {
            *out = y.re;
        }
    }
}
