//! Engine lifecycle integration tests
//!
//! Tests engine creation, device start and retries, and stop semantics.

use crate::helpers::*;
use doze::prelude::*;
use doze::{Error, PlaybackState, PROGRESS_STOPPED};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_engine_reports_sink_format() {
    let rig = realtime_rig(test_builder());
    assert_eq!(rig.engine.format(), None);

    rig.engine.start().unwrap();
    assert_eq!(rig.engine.format(), Some(SinkFormat::new(TEST_SAMPLE_RATE, 2)));
    assert!(rig.engine.is_running());

    rig.engine.stop();
    assert!(!rig.engine.is_running());
}

/// The device is retried, then the failure reaches the caller of `start`.
#[test]
fn test_device_start_failure_is_reported() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let engine = test_builder()
        .start_attempts(3)
        .sink_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(doze::core::Error::InvalidDevice("no device".into()))
        })
        .build()
        .unwrap();

    let result = engine.start();
    assert!(matches!(
        result,
        Err(Error::Core(doze::core::Error::DeviceStart { attempts: 3, .. }))
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(!engine.is_running());
}

#[test]
fn test_device_recovers_on_retry() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let engine = test_builder()
        .sink_factory(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(doze::core::Error::InvalidDevice("busy".into()))
            } else {
                Ok(Box::new(MemorySink::new(SinkFormat::new(TEST_SAMPLE_RATE, 2)).realtime())
                    as Box<dyn AudioSink>)
            }
        })
        .build()
        .unwrap();

    engine.start().unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    engine.stop();
}

#[test]
fn test_double_start_is_rejected() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    assert!(matches!(
        rig.engine.start(),
        Err(Error::Core(doze::core::Error::AlreadyStarted))
    ));
}

#[test]
fn test_stopped_engine_cannot_restart() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    rig.engine.stop();
    assert!(matches!(rig.engine.start(), Err(Error::Stopped)));
}

#[test]
fn test_stop_delivers_final_progress_once() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::flat());
    assert!(rig.wait_for_complete_run());

    rig.engine.stop();
    rig.engine.stop();
    assert_eq!(rig.engine.dispatch_progress(), 0);

    let seen = rig.progress();
    assert_eq!(seen.last(), Some(&PROGRESS_STOPPED));
    assert_eq!(seen.iter().filter(|&&p| p == PROGRESS_STOPPED).count(), 1);
    assert_eq!(rig.engine.playback_state(), PlaybackState::Released);
}

/// A listener that stops the engine gets -1 next and nothing after it,
/// even with more progress queued in the same dispatch.
#[test]
fn test_listener_may_stop_the_engine() {
    init_tracing();
    let mut sink = Some(MemorySink::new(SinkFormat::new(TEST_SAMPLE_RATE, 2)).realtime());
    let engine = Arc::new(
        test_builder()
            .sink_factory(move || {
                sink.take()
                    .map(|s| Box::new(s) as Box<dyn AudioSink>)
                    .ok_or_else(|| doze::core::Error::InvalidDevice("sink already used".into()))
            })
            .build()
            .unwrap(),
    );

    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let handle = Arc::downgrade(&engine);
    engine.on_progress(move |p| {
        record.lock().unwrap().push(p);
        if p == 0 {
            if let Some(engine) = handle.upgrade() {
                engine.stop();
            }
        }
    });

    engine.start().unwrap();
    engine.set_envelope(SpectralEnvelope::flat());
    // Let the whole run queue up so one dispatch carries several values
    thread::sleep(Duration::from_millis(500));

    let deadline = Instant::now() + TEST_TIMEOUT;
    while seen.lock().unwrap().is_empty() && Instant::now() < deadline {
        engine.dispatch_progress();
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(*seen.lock().unwrap(), vec![0, PROGRESS_STOPPED]);
    assert_eq!(engine.dispatch_progress(), 0);
    assert_eq!(*seen.lock().unwrap(), vec![0, PROGRESS_STOPPED]);
    assert_eq!(engine.playback_state(), PlaybackState::Released);
}

#[test]
fn test_invalid_config_rejected_at_build() {
    let result = test_builder().fade_len(10_000).build();
    assert!(matches!(result, Err(Error::InvalidConfig(_))));

    let result = test_builder().duck_gain(3.0).build();
    assert!(matches!(result, Err(Error::Core(_))));
}
