//! Output sinks the playback driver writes interleaved i16 frames into.

#[cfg(feature = "device")]
mod device;

#[cfg(feature = "device")]
pub use device::CpalSink;

use crate::lockfree::AtomicFlag;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Stream format, queried once when the sink is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl SinkFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }
}

impl Default for SinkFormat {
    fn default() -> Self {
        Self::new(44100, 2)
    }
}

/// Closes a sink from another thread.
///
/// After `close()`, the sink's `write` returns a short count (or -1 if it
/// wrote nothing), which the playback driver treats as external stop.
#[derive(Debug, Clone, Default)]
pub struct SinkHandle {
    closed: Arc<AtomicFlag>,
}

impl SinkHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.set(true);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Blocking streaming output.
pub trait AudioSink: Send {
    fn format(&self) -> SinkFormat;

    /// Handle that can close this sink from the control thread.
    fn handle(&self) -> SinkHandle;

    /// Write interleaved samples, blocking until they are queued.
    ///
    /// Returns the number of samples written. Anything less than
    /// `samples.len()` (or a negative value) means the sink was stopped.
    fn write(&mut self, samples: &[i16]) -> isize;
}

/// Opens a sink. Called once per start attempt.
pub type SinkFactory = Box<dyn FnMut() -> Result<Box<dyn AudioSink>> + Send>;

/// Samples captured by a [`MemorySink`], readable while it plays.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecording {
    samples: Arc<Mutex<Vec<i16>>>,
}

impl MemoryRecording {
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Copy of everything written so far.
    pub fn samples(&self) -> Vec<i16> {
        self.samples.lock().clone()
    }
}

/// In-memory sink for tests and offline rendering.
pub struct MemorySink {
    format: SinkFormat,
    recording: MemoryRecording,
    handle: SinkHandle,
    limit: Option<usize>,
    realtime: bool,
}

impl MemorySink {
    pub fn new(format: SinkFormat) -> Self {
        Self {
            format,
            recording: MemoryRecording::default(),
            handle: SinkHandle::new(),
            limit: None,
            realtime: false,
        }
    }

    /// Close automatically once `samples` samples have been recorded.
    pub fn with_limit(mut self, samples: usize) -> Self {
        self.limit = Some(samples);
        self
    }

    /// Sleep for each buffer's playback duration, like a device would.
    pub fn realtime(mut self) -> Self {
        self.realtime = true;
        self
    }

    pub fn recording(&self) -> MemoryRecording {
        self.recording.clone()
    }
}

impl AudioSink for MemorySink {
    fn format(&self) -> SinkFormat {
        self.format
    }

    fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }

    fn write(&mut self, samples: &[i16]) -> isize {
        if self.handle.is_closed() {
            return -1;
        }

        let accepted = {
            let mut recorded = self.recording.samples.lock();
            let room = self
                .limit
                .map_or(samples.len(), |limit| limit.saturating_sub(recorded.len()));
            let accepted = room.min(samples.len());
            recorded.extend_from_slice(&samples[..accepted]);
            accepted
        };

        if accepted < samples.len() {
            self.handle.close();
        }

        if self.realtime && self.format.sample_rate > 0 {
            let frames = accepted / self.format.channels.max(1) as usize;
            std::thread::sleep(Duration::from_secs_f64(
                frames as f64 / self.format.sample_rate as f64,
            ));
        }

        accepted as isize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemorySink::new(SinkFormat::new(8000, 2));
        let recording = sink.recording();
        assert_eq!(sink.write(&[1, 2, 3, 4]), 4);
        assert_eq!(recording.samples(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_memory_sink_limit_reports_short_write() {
        let mut sink = MemorySink::new(SinkFormat::default()).with_limit(6);
        assert_eq!(sink.write(&[0; 4]), 4);
        assert_eq!(sink.write(&[0; 4]), 2);
        assert!(sink.handle().is_closed());
        assert_eq!(sink.write(&[0; 4]), -1);
        assert_eq!(sink.recording().len(), 6);
    }

    #[test]
    fn test_close_from_handle() {
        let mut sink = MemorySink::new(SinkFormat::default());
        let handle = sink.handle();
        handle.close();
        assert_eq!(sink.write(&[0; 4]), -1);
        assert!(sink.recording().is_empty());
    }
}
