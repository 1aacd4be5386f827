//! Integration test modules for doze

pub mod engine;
pub mod envelope;
pub mod playback;
