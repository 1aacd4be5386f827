//! Background spectral noise synthesis for doze.
//!
//! - [`Synthesizer`]: owns the [`doze_core::Leveler`] on its own thread and
//!   produces one segment per progress step
//! - [`NoiseGenerator`]: random spectrum, band shaping, inverse transform
//! - [`InverseTransform`] / [`FftDct`]: the cosine transform kernel

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::SynthConfig;

pub mod transform;
pub use transform::{FftDct, InverseTransform};

pub mod spectrum;
pub use spectrum::BandLayout;

pub mod generator;
pub use generator::NoiseGenerator;

mod synthesizer;
pub use synthesizer::Synthesizer;
