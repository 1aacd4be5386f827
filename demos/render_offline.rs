//! # Render Offline
//!
//! Render ten seconds of brown-ish noise into memory, without an audio
//! device, and write it to a stereo WAV file.
//!
//! **Concepts:** Custom sinks, `MemorySink`, WAV export
//!
//! ```bash
//! cargo run --example render_offline --no-default-features
//! ```

use doze::prelude::*;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::time::Duration;

const SAMPLE_RATE: u32 = 44_100;
const SECONDS: usize = 10;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let format = SinkFormat::new(SAMPLE_RATE, 2);
    let samples = SAMPLE_RATE as usize * SECONDS * format.channels as usize;

    let sink = MemorySink::new(format).with_limit(samples);
    let recording = sink.recording();
    let mut sink = Some(sink);

    let engine = DozeEngine::builder()
        .seed(7)
        .sink_factory(move || {
            sink.take()
                .map(|s| Box::new(s) as Box<dyn AudioSink>)
                .ok_or_else(|| doze::core::Error::InvalidDevice("render sink already used".into()))
        })
        .build()?;
    engine.on_progress(|percent| print!("\rsynthesis {percent:>3}%"));
    engine.start()?;

    let bands: [f32; BAND_COUNT] = std::array::from_fn(|i| (1.0 - i as f32 / 24.0).max(0.05));
    engine.set_spectral_envelope(bands, 0.6, 6.0);

    while recording.len() < samples {
        engine.dispatch_progress();
        std::thread::sleep(Duration::from_millis(20));
    }
    engine.stop();
    println!();

    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let path = std::env::temp_dir().join("doze_render.wav");
    let mut writer = WavWriter::create(&path, spec)?;
    for sample in recording.samples() {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    println!("Rendered {SECONDS}s to {}", path.display());
    Ok(())
}
