//! DozeEngine that coordinates synthesis and playback

use crate::config::DozeConfig;
use crate::{DozeEngineBuilder, Error, Result};
use crossbeam_channel::{unbounded, Sender};
use doze_core::envelope::BAND_COUNT;
use doze_core::{
    AtomicFlag, DuckLevel, Leveler, Mixer, MixerCommand, OutputControls, PlaybackDriver,
    PlaybackState, SinkFactory, SinkFormat, SpectralEnvelope,
};
use doze_synth::Synthesizer;
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;

type ProgressListener = Box<dyn FnMut(i32) + Send>;

/// A progress value waiting for the listener. `closing` values come from
/// [`DozeEngine::stop`] and are the only ones delivered once stopped.
#[derive(Clone, Copy)]
struct QueuedProgress {
    value: i32,
    closing: bool,
}

/// Progress value delivered once when the engine stops.
pub const PROGRESS_STOPPED: i32 = -1;

struct Running {
    synth: Synthesizer,
    playback: PlaybackDriver,
    commands: Sender<MixerCommand>,
    format: SinkFormat,
}

/// Main engine: a background synthesizer feeding a crossfading player.
///
/// All methods take `&self` and may be called from any thread. Progress is
/// delivered to the listener registered with [`on_progress`](Self::on_progress)
/// on whichever thread calls [`dispatch_progress`](Self::dispatch_progress),
/// normally the control thread.
///
/// # Example
///
/// ```ignore
/// use doze::prelude::*;
///
/// let engine = DozeEngine::builder().build()?;
/// engine.on_progress(|percent| println!("synthesis {percent}%"));
/// engine.start()?;
///
/// engine.set_spectral_envelope([0.5; 32], 1.0, 10.0);
/// loop {
///     engine.dispatch_progress();
///     std::thread::sleep(std::time::Duration::from_millis(50));
/// }
/// ```
pub struct DozeEngine {
    config: DozeConfig,
    controls: Arc<OutputControls>,
    sink_factory: Mutex<SinkFactory>,
    running: Mutex<Option<Running>>,
    last_envelope: Mutex<Option<SpectralEnvelope>>,
    listener: Mutex<Option<ProgressListener>>,
    queued: Mutex<Vec<QueuedProgress>>,
    delivering: AtomicFlag,
    stopped: AtomicFlag,
}

impl DozeEngine {
    pub fn builder() -> DozeEngineBuilder {
        DozeEngineBuilder::default()
    }

    pub(crate) fn from_parts(config: DozeConfig, sink_factory: SinkFactory) -> Self {
        Self {
            config,
            controls: Arc::new(OutputControls::default()),
            sink_factory: Mutex::new(sink_factory),
            running: Mutex::new(None),
            last_envelope: Mutex::new(None),
            listener: Mutex::new(None),
            queued: Mutex::new(Vec::new()),
            delivering: AtomicFlag::new(false),
            stopped: AtomicFlag::new(false),
        }
    }

    pub fn config(&self) -> &DozeConfig {
        &self.config
    }

    /// Open the output, then start the playback and synthesizer threads.
    ///
    /// Device failures are retried per [`PlaybackConfig`](doze_core::PlaybackConfig)
    /// and returned here once exhausted.
    pub fn start(&self) -> Result<()> {
        if self.stopped.get() {
            return Err(Error::Stopped);
        }
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(doze_core::Error::AlreadyStarted.into());
        }

        let (updates_tx, updates_rx) = unbounded();
        let (commands_tx, commands_rx) = unbounded();

        let mut playback =
            PlaybackDriver::new(self.config.playback.clone(), self.config.mixer.buffer_frames);
        let mixer_config = self.config.mixer.clone();
        let mixer_controls = Arc::clone(&self.controls);
        let seed = self.config.synth.seed;

        let format = {
            let mut factory = self.sink_factory.lock();
            playback.start(
                &mut factory,
                move |format| {
                    let mixer = Mixer::new(
                        mixer_config,
                        format.sample_rate as f64,
                        updates_rx,
                        commands_rx,
                        mixer_controls,
                    );
                    match seed {
                        Some(seed) => mixer.with_seed(seed),
                        None => mixer,
                    }
                },
                Arc::clone(&self.controls),
            )?
        };

        let leveler = Leveler::new(self.config.mixer.fade_len, updates_tx);
        let synth = Synthesizer::start(
            self.config.synth.clone(),
            format.sample_rate as f64,
            leveler,
        )?;

        if let Some(envelope) = *self.last_envelope.lock() {
            let _ = commands_tx.send(wave_command(&envelope));
            synth.set_envelope(envelope);
        }

        tracing::info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            "doze engine started"
        );

        *running = Some(Running {
            synth,
            playback,
            commands: commands_tx,
            format,
        });
        Ok(())
    }

    /// Stop both threads and deliver [`PROGRESS_STOPPED`] to the listener.
    ///
    /// Progress reported before the stop is dispatched first; nothing is
    /// delivered afterwards. Idempotent.
    pub fn stop(&self) {
        if self.stopped.swap(true) {
            return;
        }

        let mut leftover = Vec::new();
        let running = self.running.lock().take();
        if let Some(mut running) = running {
            running.synth.stop();
            leftover.extend(running.synth.progress().try_iter());
            running.playback.stop();
            tracing::info!("doze engine stopped");
        }
        leftover.push(PROGRESS_STOPPED);
        self.deliver(&leftover, true);
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| r.playback.state() != PlaybackState::Released)
    }

    /// Output format, once started.
    pub fn format(&self) -> Option<SinkFormat> {
        self.running.lock().as_ref().map(|r| r.format)
    }

    pub fn playback_state(&self) -> PlaybackState {
        if self.stopped.get() {
            return PlaybackState::Released;
        }
        self.running
            .lock()
            .as_ref()
            .map_or(PlaybackState::Idle, |r| r.playback.state())
    }

    /// Set the target spectrum and breathing parameters.
    ///
    /// Latest wins; a bit-identical repeat is ignored. Only a change in band
    /// values restarts synthesis, floor and period changes reshape the
    /// breathing wave without interrupting it.
    ///
    /// # Panics
    /// Panics on a malformed envelope (see [`SpectralEnvelope::try_new`]).
    pub fn set_spectral_envelope(
        &self,
        bands: [f32; BAND_COUNT],
        volume_floor: f32,
        period_seconds: f32,
    ) {
        self.set_envelope(SpectralEnvelope::new(bands, volume_floor, period_seconds));
    }

    pub fn set_envelope(&self, envelope: SpectralEnvelope) {
        // Both guards stay held while forwarding so concurrent callers reach
        // the synthesizer and mixer in the order they were recorded
        let running = self.running.lock();
        let mut last = self.last_envelope.lock();
        if *last == Some(envelope) {
            return;
        }
        let modulation_changed = last.map_or(true, |l| {
            l.volume_floor().to_bits() != envelope.volume_floor().to_bits()
                || l.period_seconds().to_bits() != envelope.period_seconds().to_bits()
        });
        *last = Some(envelope);

        if let Some(running) = running.as_ref() {
            if modulation_changed {
                let _ = running.commands.send(wave_command(&envelope));
            }
            running.synth.set_envelope(envelope);
        }
    }

    pub fn envelope(&self) -> Option<SpectralEnvelope> {
        *self.last_envelope.lock()
    }

    /// Applied at the next buffer fill.
    pub fn set_duck_level(&self, level: DuckLevel) {
        self.controls.duck.set(level);
    }

    pub fn duck_level(&self) -> DuckLevel {
        self.controls.duck.get()
    }

    /// User volume limit in `[0, 1]`, applied at the next buffer fill.
    pub fn set_volume_level(&self, volume: f32) {
        self.controls.volume.set(volume.clamp(0.0, 1.0));
    }

    pub fn volume_level(&self) -> f32 {
        self.controls.volume.get()
    }

    /// Abrupt-replace crossfades the mixer has performed.
    pub fn abrupt_crossfades(&self) -> u64 {
        self.controls.abrupt_crossfades.load(Ordering::Relaxed)
    }

    /// Register the progress listener, replacing any previous one.
    pub fn on_progress<F>(&self, listener: F)
    where
        F: FnMut(i32) + Send + 'static,
    {
        *self.listener.lock() = Some(Box::new(listener));
    }

    /// Deliver queued progress values to the listener on the calling thread.
    ///
    /// Returns how many values were taken from the synthesizer. Delivery
    /// ends as soon as the engine stops, even mid-batch.
    pub fn dispatch_progress(&self) -> usize {
        if self.stopped.get() {
            return 0;
        }
        let values: Vec<i32> = match self.running.lock().as_ref() {
            Some(running) => running.synth.progress().try_iter().collect(),
            None => return 0,
        };
        self.deliver(&values, false);
        values.len()
    }

    /// Queue `values` and flush the queue unless a flush is already running
    /// further up this or another thread's stack, which then picks them up.
    fn deliver(&self, values: &[i32], closing: bool) {
        self.queued
            .lock()
            .extend(values.iter().map(|&value| QueuedProgress { value, closing }));

        loop {
            if self.delivering.swap(true) {
                return;
            }
            self.flush_queued();
            self.delivering.set(false);
            if self.queued.lock().is_empty() {
                return;
            }
        }
    }

    fn flush_queued(&self) {
        // Called without the listener lock held so the listener may touch the engine
        let mut listener = self.listener.lock().take();
        loop {
            let batch = std::mem::take(&mut *self.queued.lock());
            if batch.is_empty() {
                break;
            }
            for queued in batch {
                if !queued.closing && self.stopped.get() {
                    continue;
                }
                if let Some(listener) = listener.as_mut() {
                    listener(queued.value);
                }
            }
        }
        if let Some(listener) = listener {
            let mut slot = self.listener.lock();
            if slot.is_none() {
                *slot = Some(listener);
            }
        }
    }
}

impl Drop for DozeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wave_command(envelope: &SpectralEnvelope) -> MixerCommand {
    MixerCommand::SetWave {
        volume_floor: envelope.volume_floor(),
        period_seconds: envelope.period_seconds(),
    }
}
