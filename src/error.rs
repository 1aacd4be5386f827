//! Centralized error type for the doze umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] doze_core::Error),

    #[error("Synth: {0}")]
    Synth(#[from] doze_synth::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Engine has been stopped")]
    Stopped,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
