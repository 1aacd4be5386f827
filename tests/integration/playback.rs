//! Playback integration tests
//!
//! End-to-end runs over a memory sink: silence, edits during synthesis,
//! stop during throttle, duck and volume control.

use crate::helpers::*;
use doze::prelude::*;
use doze::PROGRESS_STOPPED;
use std::thread;
use std::time::{Duration, Instant};

/// An all-zero spectrum synthesizes to completion and plays pure silence.
#[test]
fn test_silent_envelope_plays_silence() {
    let rig = offline_rig(test_builder(), 16_000);
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::silent());

    assert!(rig.wait_for_complete_run());
    assert!(rig.wait_for_samples(16_000));

    let samples = rig.recording.samples();
    assert_eq!(samples.len(), 16_000);
    assert!(samples.iter().all(|&s| s == 0));
}

/// A spectral edit mid-synthesis restarts progress and splices the new
/// sound in with exactly one abrupt crossfade.
#[test]
fn test_edit_during_synthesis_crossfades_once() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();

    rig.engine.set_spectral_envelope([0.8; BAND_COUNT], 1.0, 10.0);
    assert!(rig.wait_until(|seen| seen.iter().any(|&p| p >= 50)));
    // Let the mixer pick up the first pool
    let mark = rig.recording.len();
    assert!(rig.wait_for_samples(mark + 4 * TEST_BUFFER_FRAMES * 2));
    assert_eq!(rig.engine.abrupt_crossfades(), 0);

    rig.engine
        .set_spectral_envelope(bands(|i| if i < 16 { 0.9 } else { 0.1 }), 1.0, 10.0);
    assert!(rig.wait_for_complete_run());

    // Give the mixer a few fills to apply the new pioneer
    let mark = rig.recording.len();
    assert!(rig.wait_for_samples(mark + 4 * TEST_BUFFER_FRAMES * 2));
    assert_eq!(rig.engine.abrupt_crossfades(), 1);

    let seen = rig.progress();
    let restart = seen.iter().rposition(|&p| p == 0).unwrap();
    assert!(restart > 0);
    assert!(seen[restart..].windows(2).all(|w| w[0] <= w[1]));
}

/// Stopping while the synthesizer is pacing itself returns promptly and
/// nothing but the final -1 is delivered afterwards.
#[test]
fn test_stop_during_throttle() {
    let builder = test_builder()
        .segment_sizes(512, 65_536)
        .throttle_fraction(1.0);
    let rig = realtime_rig(builder);
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::flat());

    // 2 small + 2 large accepted; the next large step waits ~8 s
    assert!(rig.wait_until(|seen| seen.contains(&50)));
    thread::sleep(Duration::from_millis(100));
    rig.engine.dispatch_progress();
    assert_eq!(rig.progress().last(), Some(&50));

    let started = Instant::now();
    rig.engine.stop();
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(rig.progress().last(), Some(&PROGRESS_STOPPED));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(rig.engine.dispatch_progress(), 0);
    assert_eq!(rig.progress().last(), Some(&PROGRESS_STOPPED));
}

#[test]
fn test_volume_zero_silences_output() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::flat());
    assert!(rig.wait_for_complete_run());
    assert!(rig.wait_for_samples(8 * TEST_BUFFER_FRAMES * 2));

    rig.engine.set_volume_level(0.0);
    thread::sleep(Duration::from_millis(100));
    let mark = rig.recording.len();
    thread::sleep(Duration::from_millis(150));

    let samples = rig.recording.samples();
    assert!(samples.len() > mark);
    assert!(samples[mark..].iter().all(|&s| s == 0));

    rig.engine.set_volume_level(1.0);
    thread::sleep(Duration::from_millis(100));
    let mark = rig.recording.len();
    thread::sleep(Duration::from_millis(150));
    assert!(rig.recording.samples()[mark..].iter().any(|&s| s != 0));
}

#[test]
fn test_silent_duck_ramps_out_and_back() {
    let rig = realtime_rig(test_builder());
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::flat());
    assert!(rig.wait_for_complete_run());

    rig.engine.set_duck_level(DuckLevel::Silent);
    thread::sleep(Duration::from_millis(200));
    let mark = rig.recording.len();
    thread::sleep(Duration::from_millis(150));
    assert!(rig.recording.samples()[mark..].iter().all(|&s| s == 0));

    rig.engine.set_duck_level(DuckLevel::Normal);
    thread::sleep(Duration::from_millis(200));
    let mark = rig.recording.len();
    thread::sleep(Duration::from_millis(150));
    assert!(rig.recording.samples()[mark..].iter().any(|&s| s != 0));
}

/// The right channel is the left channel's buffer played backward.
#[test]
fn test_stereo_channels_mirror_each_buffer() {
    let rig = offline_rig(test_builder(), 64 * TEST_BUFFER_FRAMES * 2);
    rig.engine.start().unwrap();
    rig.engine.set_envelope(SpectralEnvelope::flat());
    assert!(rig.wait_for_samples(64 * TEST_BUFFER_FRAMES * 2));

    let samples = rig.recording.samples();
    for buffer in samples.chunks_exact(TEST_BUFFER_FRAMES * 2) {
        let left = left_channel(buffer);
        let right: Vec<i16> = buffer.iter().skip(1).step_by(2).copied().collect();
        let reversed: Vec<i16> = left.iter().rev().copied().collect();
        assert_eq!(right, reversed);
    }
    assert!(samples.iter().any(|&s| s != 0));
}
