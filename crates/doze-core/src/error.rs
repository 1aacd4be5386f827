//! Error types for doze-core.

use thiserror::Error;

/// Error type for doze-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[cfg(feature = "device")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "device")]
    #[error("Failed to enumerate audio devices")]
    Devices(#[from] cpal::DevicesError),

    #[cfg(feature = "device")]
    #[error("Failed to query device name")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[cfg(feature = "device")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "device")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Audio device failed to start after {attempts} attempts: {last}")]
    DeviceStart { attempts: u32, last: String },

    #[error("Playback driver already started")]
    AlreadyStarted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
