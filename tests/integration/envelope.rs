//! Envelope update integration tests
//!
//! Progress reporting, idempotent updates and modulation-only edits.

use crate::helpers::*;
use doze::prelude::*;
use std::thread;
use std::time::Duration;

#[test]
fn test_progress_runs_from_zero_to_hundred() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    rig.engine.set_spectral_envelope(bands(|i| 1.0 - i as f32 / 64.0), 1.0, 10.0);
    assert!(rig.wait_for_complete_run());

    let seen = rig.progress();
    assert_eq!(seen, vec![0, 12, 25, 37, 50, 62, 75, 87, 100]);
}

/// Setting a bit-identical envelope again is a no-op.
#[test]
fn test_identical_envelope_is_ignored() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::flat());
    assert!(rig.wait_for_complete_run());
    let before = rig.progress().len();

    rig.engine.set_envelope(SpectralEnvelope::flat());
    thread::sleep(Duration::from_millis(200));
    assert_eq!(rig.engine.dispatch_progress(), 0);
    assert_eq!(rig.progress().len(), before);
}

/// Floor and period edits reshape the breathing without resynthesizing.
#[test]
fn test_modulation_edit_keeps_pool() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    let envelope = SpectralEnvelope::flat();
    rig.engine.set_envelope(envelope);
    assert!(rig.wait_for_complete_run());

    rig.engine
        .set_spectral_envelope(*envelope.bands(), 0.25, 3.0);
    thread::sleep(Duration::from_millis(200));
    assert_eq!(rig.engine.dispatch_progress(), 0);

    let current = rig.engine.envelope().unwrap();
    assert_eq!(current.volume_floor(), 0.25);
    assert_eq!(current.period_seconds(), 3.0);
    assert_eq!(rig.engine.abrupt_crossfades(), 0);
}

/// An envelope set before `start` is picked up when the engine starts.
#[test]
fn test_envelope_before_start() {
    let rig = realtime_rig(test_builder());
    rig.engine.set_envelope(SpectralEnvelope::flat());
    assert_eq!(rig.engine.dispatch_progress(), 0);

    rig.engine.start().unwrap();
    assert!(rig.wait_for_complete_run());
}

/// Only the latest of several rapid edits is guaranteed to be synthesized.
#[test]
fn test_latest_envelope_wins() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();

    for level in [0.1, 0.2, 0.3, 0.4, 0.5] {
        rig.engine.set_spectral_envelope([level; BAND_COUNT], 1.0, 10.0);
    }
    assert!(rig.wait_until(|seen| seen.last() == Some(&100)));
    thread::sleep(Duration::from_millis(200));
    assert!(rig.wait_until(|seen| seen.last() == Some(&100)));
    assert_eq!(rig.engine.envelope().unwrap().bands()[0], 0.5);

    // Nothing else is pending once the last run finished
    thread::sleep(Duration::from_millis(200));
    assert_eq!(rig.engine.dispatch_progress(), 0);
}

#[test]
#[should_panic]
fn test_malformed_envelope_panics() {
    let rig = realtime_rig(test_builder());
    rig.engine.set_spectral_envelope([1.5; BAND_COUNT], 1.0, 10.0);
}
