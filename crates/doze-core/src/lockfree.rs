//! Lock-free control values shared with the playback thread.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Interruption level requested by the host (audio focus, phone calls).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum DuckLevel {
    Silent = 0,
    Duck = 1,
    #[default]
    Normal = 2,
}

impl DuckLevel {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DuckLevel::Silent,
            1 => DuckLevel::Duck,
            _ => DuckLevel::Normal,
        }
    }
}

/// Atomic cell holding a [`DuckLevel`].
#[derive(Debug)]
pub struct AtomicDuckLevel {
    value: AtomicU8,
}

impl AtomicDuckLevel {
    pub fn new(level: DuckLevel) -> Self {
        Self {
            value: AtomicU8::new(level as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> DuckLevel {
        DuckLevel::from_u8(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, level: DuckLevel) {
        self.value.store(level as u8, Ordering::Release);
    }
}

impl Default for AtomicDuckLevel {
    fn default() -> Self {
        Self::new(DuckLevel::Normal)
    }
}
