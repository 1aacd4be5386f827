//! Playback driver: pulls buffers from the mixer and writes them to a sink.
//!
//! The sink is opened synchronously in [`PlaybackDriver::start`], retried a
//! bounded number of times, so device failures reach the caller. The loop
//! then runs on its own elevated-priority thread until the sink reports a
//! short write.

use crate::config::PlaybackConfig;
use crate::mixer::{Mixer, OutputControls};
use crate::output::{AudioSink, SinkFactory, SinkFormat, SinkHandle};
use crate::{Error, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thread_priority::ThreadPriority;

/// How long one wait for the first segment lasts before re-checking the sink.
const AUDIO_WAIT: Duration = Duration::from_millis(50);

/// Lifecycle of a [`PlaybackDriver`].
///
/// The sink is opened before any segment exists, so `Started` means the
/// device is open and the thread is waiting for the first segment, and
/// `Running` means audio is flowing to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PlaybackState {
    /// Not started, or the thread failed to spawn.
    Idle = 0,
    /// Device open, waiting for the first segment.
    Started = 1,
    /// Writing mixed buffers to the device.
    Running = 2,
    /// The sink stopped accepting samples, or `stop` was requested.
    Stopping = 3,
    /// Thread joined and sink closed.
    Released = 4,
}

impl PlaybackState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Started,
            2 => Self::Running,
            3 => Self::Stopping,
            4 => Self::Released,
            _ => Self::Idle,
        }
    }
}

pub struct PlaybackDriver {
    config: PlaybackConfig,
    buffer_frames: usize,
    state: Arc<AtomicU8>,
    sink_handle: Option<SinkHandle>,
    format: Option<SinkFormat>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    pub fn new(config: PlaybackConfig, buffer_frames: usize) -> Self {
        Self {
            config,
            buffer_frames: buffer_frames.max(1),
            state: Arc::new(AtomicU8::new(PlaybackState::Idle as u8)),
            sink_handle: None,
            format: None,
            thread_handle: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Format of the opened sink, once started.
    pub fn format(&self) -> Option<SinkFormat> {
        self.format
    }

    /// Open the sink, build the mixer for its format and start the thread.
    ///
    /// Returns the sink's format.
    pub fn start<F>(
        &mut self,
        factory: &mut SinkFactory,
        build_mixer: F,
        controls: Arc<OutputControls>,
    ) -> Result<SinkFormat>
    where
        F: FnOnce(SinkFormat) -> Mixer,
    {
        if self.state() != PlaybackState::Idle {
            return Err(Error::AlreadyStarted);
        }

        let sink = open_with_retry(&self.config, factory)?;
        let format = sink.format();
        let mixer = build_mixer(format);
        let handle = sink.handle();
        self.state
            .store(PlaybackState::Started as u8, Ordering::Release);

        let state = Arc::clone(&self.state);
        let buffer_frames = self.buffer_frames;
        let realtime = self.config.realtime_priority;

        let spawned = thread::Builder::new()
            .name("doze-playback".into())
            .spawn(move || {
                if realtime {
                    if let Err(err) = thread_priority::set_current_thread_priority(ThreadPriority::Max) {
                        tracing::debug!(?err, "could not raise playback thread priority");
                    }
                }
                playback_loop(mixer, sink, &controls, &state, buffer_frames);
            });

        let thread_handle = match spawned {
            Ok(thread_handle) => thread_handle,
            Err(err) => {
                self.state.store(PlaybackState::Idle as u8, Ordering::Release);
                return Err(err.into());
            }
        };

        tracing::debug!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            buffer_frames,
            "playback started"
        );

        self.sink_handle = Some(handle);
        self.format = Some(format);
        self.thread_handle = Some(thread_handle);
        Ok(format)
    }

    /// Close the sink and join the playback thread.
    pub fn stop(&mut self) {
        let Some(thread_handle) = self.thread_handle.take() else {
            return;
        };

        self.state
            .store(PlaybackState::Stopping as u8, Ordering::Release);
        if let Some(handle) = self.sink_handle.take() {
            handle.close();
        }
        if thread_handle.join().is_err() {
            tracing::warn!("playback thread panicked");
        }
        self.state
            .store(PlaybackState::Released as u8, Ordering::Release);
        tracing::debug!("playback released");
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Call `factory` up to `config.start_attempts` times.
pub fn open_with_retry(
    config: &PlaybackConfig,
    factory: &mut SinkFactory,
) -> Result<Box<dyn AudioSink>> {
    let mut last = String::new();

    for attempt in 1..=config.start_attempts {
        match factory() {
            Ok(sink) => return Ok(sink),
            Err(err) => {
                tracing::warn!(attempt, %err, "failed to start output device");
                last = err.to_string();
                if attempt < config.start_attempts {
                    thread::sleep(Duration::from_millis(config.retry_delay_ms));
                }
            }
        }
    }

    Err(Error::DeviceStart {
        attempts: config.start_attempts,
        last,
    })
}

fn playback_loop(
    mut mixer: Mixer,
    mut sink: Box<dyn AudioSink>,
    controls: &OutputControls,
    state: &AtomicU8,
    buffer_frames: usize,
) {
    let channels = sink.format().channels.max(1) as usize;
    let handle = sink.handle();
    let mut buffer = vec![0i16; buffer_frames * channels];

    while !mixer.wait_for_audio(AUDIO_WAIT) {
        if handle.is_closed() {
            mark_stopping(state);
            return;
        }
    }

    let _ = state.compare_exchange(
        PlaybackState::Started as u8,
        PlaybackState::Running as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
    );

    loop {
        mixer.fill(&mut buffer, channels);
        apply_volume(&mut buffer, controls.volume.get());

        let written = sink.write(&buffer);
        if written < buffer.len() as isize {
            break;
        }
    }

    mark_stopping(state);
}

fn mark_stopping(state: &AtomicU8) {
    let _ = state.compare_exchange(
        PlaybackState::Running as u8,
        PlaybackState::Stopping as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
    );
    let _ = state.compare_exchange(
        PlaybackState::Started as u8,
        PlaybackState::Stopping as u8,
        Ordering::AcqRel,
        Ordering::Acquire,
    );
}

#[inline]
fn apply_volume(buffer: &mut [i16], volume: f32) {
    let volume = volume.clamp(0.0, 1.0);
    if volume >= 1.0 {
        return;
    }
    for sample in buffer.iter_mut() {
        *sample = (*sample as f32 * volume).round() as i16;
    }
}
