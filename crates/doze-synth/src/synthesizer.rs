//! Background synthesizer thread.
//!
//! Accepts envelopes from any thread through a single pending slot (latest
//! wins), turns them into segments one progress step at a time, and hands
//! each segment to the [`Leveler`]. Progress percentages travel back over a
//! channel for the control thread to dispatch.

use crate::config::SynthConfig;
use crate::generator::NoiseGenerator;
use crate::{Error, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use doze_core::{ChunkOutcome, Leveler, SpectralEnvelope, SynthesisProgress};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thread_priority::ThreadPriority;

#[derive(Default)]
struct Pending {
    envelope: Option<SpectralEnvelope>,
    latest: Option<SpectralEnvelope>,
    stop: bool,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<Pending>,
    wake: Condvar,
}

pub struct Synthesizer {
    shared: Arc<Shared>,
    progress_rx: Receiver<i32>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Synthesizer {
    /// Spawn the synthesizer thread. It idles until the first envelope.
    pub fn start(config: SynthConfig, sample_rate: f64, leveler: Leveler) -> Result<Self> {
        let generator = NoiseGenerator::new(sample_rate, config.seed);
        Self::start_with_generator(config, generator, leveler)
    }

    /// Like [`start`](Self::start), with a caller-built generator.
    pub fn start_with_generator(
        config: SynthConfig,
        generator: NoiseGenerator,
        leveler: Leveler,
    ) -> Result<Self> {
        config.validate()?;
        let sample_rate = generator.sample_rate();
        if sample_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {sample_rate} must be positive"
            )));
        }

        let shared = Arc::new(Shared::default());
        let (progress_tx, progress_rx) = unbounded();

        let thread_shared = Arc::clone(&shared);
        let thread_handle = thread::Builder::new()
            .name("doze-synth".into())
            .spawn(move || {
                if config.background_priority {
                    if let Err(err) = thread_priority::set_current_thread_priority(ThreadPriority::Min) {
                        tracing::debug!(?err, "could not lower synthesizer thread priority");
                    }
                }
                let worker = Worker {
                    shared: thread_shared,
                    config,
                    sample_rate,
                    generator,
                    leveler,
                    progress_tx,
                };
                worker.run();
            })?;

        Ok(Self {
            shared,
            progress_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Queue an envelope; replaces any envelope not yet picked up.
    pub fn set_envelope(&self, envelope: SpectralEnvelope) {
        let mut pending = self.shared.pending.lock();
        pending.envelope = Some(envelope);
        pending.latest = Some(envelope);
        self.shared.wake.notify_one();
    }

    /// Most recent envelope handed over, picked up or not.
    pub fn target(&self) -> Option<SpectralEnvelope> {
        self.shared.pending.lock().latest
    }

    /// Progress values in `[0, 100]`, in order.
    pub fn progress(&self) -> &Receiver<i32> {
        &self.progress_rx
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle.is_some()
    }

    /// Stop and join. Bounded by one in-flight transform.
    pub fn stop(&mut self) {
        let Some(thread_handle) = self.thread_handle.take() else {
            return;
        };

        {
            let mut pending = self.shared.pending.lock();
            pending.stop = true;
            self.shared.wake.notify_one();
        }

        if thread_handle.join().is_err() {
            tracing::warn!("synthesizer thread panicked");
        }
        tracing::debug!("synthesizer stopped");
    }
}

impl Drop for Synthesizer {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    shared: Arc<Shared>,
    config: SynthConfig,
    sample_rate: f64,
    generator: NoiseGenerator,
    leveler: Leveler,
    progress_tx: Sender<i32>,
}

enum Wakeup {
    Envelope(SpectralEnvelope),
    Continue,
    Stop,
}

impl Worker {
    fn run(mut self) {
        let mut current: Option<SpectralEnvelope> = None;
        let mut progress = SynthesisProgress::new(self.config.plan);

        loop {
            let idle = current.is_none() || progress.is_done();
            match self.next_wakeup(idle) {
                Wakeup::Stop => return,
                Wakeup::Envelope(envelope) => {
                    let reset = current.map_or(true, |c| !c.same_spectrum(&envelope));
                    current = Some(envelope);
                    if reset {
                        tracing::debug!("new spectrum, restarting synthesis");
                        progress.reset();
                        self.report(progress.percent());
                    }
                }
                Wakeup::Continue => {}
            }

            let (Some(envelope), Some(stage)) = (current, progress.stage()) else {
                continue;
            };

            let size = self.config.size_for(stage.is_small());
            let samples = self.generator.generate(&envelope, size);

            match self.leveler.handle_chunk(samples, stage) {
                ChunkOutcome::Accepted => {
                    progress.advance();
                    self.report(progress.percent());
                    if progress.is_done() {
                        tracing::info!(
                            segments = self.leveler.len(),
                            volume_factor = self.leveler.volume_factor(),
                            "synthesis complete"
                        );
                    } else if !stage.is_small()
                        && progress.large_steps_done() >= self.config.throttle_after_large
                    {
                        let pause = size as f64 / self.sample_rate * self.config.throttle_fraction;
                        self.throttle(Duration::from_secs_f64(pause));
                    }
                }
                ChunkOutcome::Rejected => {}
            }
        }
    }

    /// Take the pending envelope, or block while there is nothing to do.
    fn next_wakeup(&self, idle: bool) -> Wakeup {
        let mut pending = self.shared.pending.lock();
        loop {
            if pending.stop {
                return Wakeup::Stop;
            }
            if let Some(envelope) = pending.envelope.take() {
                return Wakeup::Envelope(envelope);
            }
            if !idle {
                return Wakeup::Continue;
            }
            self.shared.wake.wait(&mut pending);
        }
    }

    /// Sleep until `pause` passes, a new envelope arrives, or stop.
    fn throttle(&self, pause: Duration) {
        let deadline = Instant::now() + pause;
        let mut pending = self.shared.pending.lock();
        while !pending.stop && pending.envelope.is_none() {
            if self.shared.wake.wait_until(&mut pending, deadline).timed_out() {
                break;
            }
        }
    }

    fn report(&self, percent: i32) {
        let _ = self.progress_tx.send(percent);
    }
}
