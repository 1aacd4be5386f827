//! Error types for doze-synth.

use thiserror::Error;

/// Result type alias for doze-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in doze-synth.
#[derive(Debug, Error)]
pub enum Error {
    /// Synthesizer thread could not be spawned.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
