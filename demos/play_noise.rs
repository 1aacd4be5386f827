//! # Play Noise
//!
//! Synthesize a pink-ish spectrum and play it through the default output
//! device, breathing slowly, then duck it and stop.
//!
//! **Concepts:** Engine setup, spectral envelope, progress, duck levels
//!
//! ```bash
//! cargo run --example play_noise
//! ```

use doze::prelude::*;
use std::time::{Duration, Instant};

fn main() -> doze::Result<()> {
    tracing_subscriber::fmt::init();

    let engine = DozeEngine::builder().build()?;
    engine.on_progress(|percent| println!("synthesis {percent}%"));
    engine.start()?;

    // Rolls off toward the top bands, breathing down to 40% every 8 seconds
    let bands: [f32; BAND_COUNT] = std::array::from_fn(|i| 1.0 - i as f32 / 40.0);
    engine.set_spectral_envelope(bands, 0.4, 8.0);

    pump(&engine, Duration::from_secs(10));

    println!("Ducking...");
    engine.set_duck_level(DuckLevel::Duck);
    pump(&engine, Duration::from_secs(3));

    engine.set_duck_level(DuckLevel::Normal);
    pump(&engine, Duration::from_secs(3));

    engine.stop();
    Ok(())
}

/// Deliver progress on this thread for `duration`.
fn pump(engine: &DozeEngine, duration: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        engine.dispatch_progress();
        std::thread::sleep(Duration::from_millis(50));
    }
}
