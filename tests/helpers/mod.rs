//! Test helpers and fixtures for doze integration tests
//!
//! Every engine here plays into a [`MemorySink`] instead of an audio device,
//! so the tests run headless in CI.

#![allow(dead_code)]

use doze::prelude::*;
use doze::{MemoryRecording, StepPlan};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Low rate keeps realtime sinks cheap
pub const TEST_SAMPLE_RATE: u32 = 8000;

pub const TEST_FADE: usize = 64;

pub const TEST_BUFFER_FRAMES: usize = 128;

/// Generous upper bound for anything the synthesizer should finish.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(20);

/// 2 small + 2 volume + 4 final steps: progress moves in 12-13% increments.
pub fn test_plan() -> StepPlan {
    StepPlan {
        small_steps: 2,
        volume_steps: 2,
        final_steps: 4,
    }
}

pub struct TestRig {
    pub engine: DozeEngine,
    pub recording: MemoryRecording,
    pub progress: Arc<Mutex<Vec<i32>>>,
}

/// Builder preconfigured for fast, deterministic, device-free runs.
pub fn test_builder() -> DozeEngineBuilder {
    DozeEngine::builder()
        .fade_len(TEST_FADE)
        .buffer_frames(TEST_BUFFER_FRAMES)
        .segment_sizes(512, 2048)
        .step_plan(test_plan())
        .throttle_fraction(0.0)
        .retry_delay_ms(1)
        .realtime_priority(false)
        .seed(1234)
}

/// Engine over a stereo memory sink paced like a real device.
pub fn realtime_rig(builder: DozeEngineBuilder) -> TestRig {
    rig(builder, MemorySink::new(SinkFormat::new(TEST_SAMPLE_RATE, 2)).realtime())
}

/// Engine over a memory sink that renders as fast as possible and stops
/// itself after `samples` samples.
pub fn offline_rig(builder: DozeEngineBuilder, samples: usize) -> TestRig {
    rig(builder, MemorySink::new(SinkFormat::new(TEST_SAMPLE_RATE, 2)).with_limit(samples))
}

fn rig(builder: DozeEngineBuilder, sink: MemorySink) -> TestRig {
    init_tracing();
    let recording = sink.recording();
    let mut sink = Some(sink);
    let engine = builder
        .sink_factory(move || {
            sink.take()
                .map(|s| Box::new(s) as Box<dyn AudioSink>)
                .ok_or_else(|| doze::core::Error::InvalidDevice("memory sink already used".into()))
        })
        .build()
        .expect("Failed to create test engine");

    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink_progress = Arc::clone(&progress);
    engine.on_progress(move |p| sink_progress.lock().unwrap().push(p));

    TestRig {
        engine,
        recording,
        progress,
    }
}

impl TestRig {
    /// Dispatch progress on this thread until `done` holds for the history.
    pub fn wait_until(&self, mut done: impl FnMut(&[i32]) -> bool) -> bool {
        let deadline = Instant::now() + TEST_TIMEOUT;
        loop {
            self.engine.dispatch_progress();
            if done(&self.progress.lock().unwrap()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Wait for a complete run started after the history's current length.
    pub fn wait_for_complete_run(&self) -> bool {
        let from = self.progress.lock().unwrap().len();
        self.wait_until(|seen| {
            let run = &seen[from.min(seen.len())..];
            run.contains(&0) && run.last() == Some(&100)
        })
    }

    pub fn progress(&self) -> Vec<i32> {
        self.progress.lock().unwrap().clone()
    }

    /// Wait for the playback thread to record at least `samples` samples.
    pub fn wait_for_samples(&self, samples: usize) -> bool {
        let deadline = Instant::now() + TEST_TIMEOUT;
        while self.recording.len() < samples {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }
}

/// Route engine logs through the test harness; RUST_LOG is not consulted.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Bands from a per-band function.
pub fn bands(f: impl Fn(usize) -> f32) -> [f32; BAND_COUNT] {
    std::array::from_fn(f)
}

/// Left channel of an interleaved stereo recording.
pub fn left_channel(samples: &[i16]) -> Vec<i16> {
    samples.iter().step_by(2).copied().collect()
}
