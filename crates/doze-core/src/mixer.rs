//! Mixer/crossfader: turns the segment pool into a continuous output stream.
//!
//! The mixer is owned by the playback thread. It reads the current segment
//! (`A`) through a [`PlaybackCursor`]; on reaching A's fade-out it draws the
//! next segment (`B`) from the shuffle selector and sums A's tail with B's
//! fade-in. When A runs out, B becomes A and continues after its fade-in.
//!
//! Pool changes arrive as [`PoolUpdate`] messages and are applied at the
//! start of the next fill. An abrupt replace first renders one fade length
//! of what the old pool would have played next, then crossfades the new
//! stream against that lookahead.

use crate::config::MixerConfig;
use crate::leveler::PoolUpdate;
use crate::lockfree::{AtomicDuckLevel, AtomicFloat, DuckLevel};
use crate::segment::{fade_out_gain, Segment};
use crate::shuffle::ShuffleSelector;
use crate::smooth::SmoothedGain;
use crate::wave::AmplitudeWave;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Control-thread requests for the mixer.
#[derive(Debug, Clone, PartialEq)]
pub enum MixerCommand {
    /// Rebuild the breathing wave, carrying the current phase forward.
    SetWave {
        volume_floor: f32,
        period_seconds: f32,
    },
}

/// Output levels shared between the control and playback threads.
#[derive(Debug)]
pub struct OutputControls {
    pub duck: AtomicDuckLevel,
    /// User volume limit in `[0, 1]`, applied by the playback driver.
    pub volume: AtomicFloat,
    /// Abrupt-replace crossfades performed by the mixer.
    pub abrupt_crossfades: AtomicU64,
}

impl Default for OutputControls {
    fn default() -> Self {
        Self {
            duck: AtomicDuckLevel::default(),
            volume: AtomicFloat::new(1.0),
            abrupt_crossfades: AtomicU64::new(0),
        }
    }
}

/// Read position within the segments currently being played.
#[derive(Debug, Clone)]
pub struct PlaybackCursor {
    current: Arc<Segment>,
    offset: usize,
    next: Option<Arc<Segment>>,
}

impl PlaybackCursor {
    fn new(current: Arc<Segment>) -> Self {
        Self {
            current,
            offset: 0,
            next: None,
        }
    }

    pub fn current(&self) -> &Arc<Segment> {
        &self.current
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn next(&self) -> Option<&Arc<Segment>> {
        self.next.as_ref()
    }
}

pub struct Mixer {
    pool: Vec<Arc<Segment>>,
    selector: ShuffleSelector,
    cursor: Option<PlaybackCursor>,
    lookahead: Vec<f32>,
    lookahead_pos: usize,
    wave: AmplitudeWave,
    duck: SmoothedGain,
    mono: Vec<f32>,
    updates: Receiver<PoolUpdate>,
    commands: Receiver<MixerCommand>,
    controls: Arc<OutputControls>,
    config: MixerConfig,
    sample_rate: f64,
    seed: Option<u64>,
    abrupt_crossfades: u64,
}

impl Mixer {
    pub fn new(
        config: MixerConfig,
        sample_rate: f64,
        updates: Receiver<PoolUpdate>,
        commands: Receiver<MixerCommand>,
        controls: Arc<OutputControls>,
    ) -> Self {
        let duck = SmoothedGain::new(1.0, config.duck_ramp_secs, sample_rate as f32);
        Self {
            pool: Vec::new(),
            selector: ShuffleSelector::new(),
            cursor: None,
            lookahead: Vec::with_capacity(config.fade_len),
            lookahead_pos: 0,
            wave: AmplitudeWave::constant(),
            duck,
            mono: Vec::with_capacity(config.buffer_frames),
            updates,
            commands,
            controls,
            config,
            sample_rate,
            seed: None,
            abrupt_crossfades: 0,
        }
    }

    /// Use deterministic shuffles (tests, offline rendering).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self.selector = ShuffleSelector::with_seed(seed);
        self
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn has_audio(&self) -> bool {
        !self.pool.is_empty()
    }

    pub fn cursor(&self) -> Option<&PlaybackCursor> {
        self.cursor.as_ref()
    }

    pub fn wave(&self) -> &AmplitudeWave {
        &self.wave
    }

    /// Abrupt-replace crossfades performed so far.
    pub fn abrupt_crossfades(&self) -> u64 {
        self.abrupt_crossfades
    }

    /// Block until the pool has audio, or `timeout` passes.
    ///
    /// Returns false on timeout or when the leveler side has gone away.
    pub fn wait_for_audio(&mut self, timeout: Duration) -> bool {
        if self.has_audio() {
            return true;
        }
        match self.updates.recv_timeout(timeout) {
            Ok(update) => {
                self.apply_update(update);
                self.apply_pool_updates();
                self.has_audio()
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                false
            }
        }
    }

    /// Fill an interleaved i16 buffer with `channels` channels.
    ///
    /// Channel 0 is the mono mix; channel 1 is the same mix played backward
    /// across the buffer, which decorrelates the channels for free.
    pub fn fill(&mut self, out: &mut [i16], channels: usize) {
        let channels = channels.max(1);
        let frames = out.len() / channels;

        self.apply_commands();
        self.apply_pool_updates();

        let mut mono = std::mem::take(&mut self.mono);
        mono.clear();
        mono.resize(frames, 0.0);

        render_stream(&mut self.cursor, &self.pool, &mut self.selector, &mut mono);
        self.mix_lookahead(&mut mono);

        self.wave.apply(&mut mono);
        self.duck.set_target(self.duck_gain());
        self.duck.apply(&mut mono);

        for (frame, chunk) in out.chunks_exact_mut(channels).enumerate() {
            for (ch, sample) in chunk.iter_mut().enumerate() {
                let value = if ch == 1 {
                    mono[frames - 1 - frame]
                } else {
                    mono[frame]
                };
                *sample = to_pcm(value);
            }
        }
        for sample in out[frames * channels..].iter_mut() {
            *sample = 0;
        }

        self.mono = mono;
    }

    fn duck_gain(&self) -> f32 {
        match self.controls.duck.get() {
            DuckLevel::Normal => 1.0,
            DuckLevel::Duck => self.config.duck_gain,
            DuckLevel::Silent => 0.0,
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                MixerCommand::SetWave {
                    volume_floor,
                    period_seconds,
                } => {
                    self.wave = AmplitudeWave::new(
                        volume_floor,
                        period_seconds,
                        self.sample_rate,
                        Some(self.wave.phase()),
                    );
                }
            }
        }
    }

    fn apply_pool_updates(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            self.apply_update(update);
        }
    }

    fn apply_update(&mut self, update: PoolUpdate) {
        match update {
            PoolUpdate::Append(segment) => {
                let index = self.pool.len();
                self.selector.insert(index, segment.was_played());
                self.pool.push(segment);
            }
            PoolUpdate::Replace { segments, abrupt } => {
                if abrupt && self.cursor.is_some() {
                    self.capture_lookahead();
                }
                if abrupt {
                    self.cursor = None;
                }

                self.selector = match self.seed {
                    Some(seed) => ShuffleSelector::with_seed(seed.wrapping_add(self.abrupt_crossfades)),
                    None => ShuffleSelector::new(),
                };
                for (index, segment) in segments.iter().enumerate() {
                    self.selector.insert(index, segment.was_played());
                }
                self.pool = segments;
            }
        }
    }

    /// Render one fade length of the old stream before it is discarded.
    ///
    /// A crossfade still in progress is folded into the new lookahead so a
    /// second replace in quick succession stays continuous.
    fn capture_lookahead(&mut self) {
        let fade_len = self.config.fade_len;
        let mut captured = vec![0.0f32; fade_len];
        render_stream(&mut self.cursor, &self.pool, &mut self.selector, &mut captured);

        for (k, sample) in captured.iter_mut().enumerate() {
            let pos = self.lookahead_pos + k;
            if pos >= self.lookahead.len() {
                break;
            }
            *sample += self.lookahead[pos] * fade_out_gain(pos, fade_len);
        }

        self.lookahead = captured;
        self.lookahead_pos = 0;
        self.abrupt_crossfades += 1;
        self.controls.abrupt_crossfades.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(fade_len, "captured lookahead for abrupt replace");
    }

    fn mix_lookahead(&mut self, mono: &mut [f32]) {
        let fade_len = self.lookahead.len();
        for sample in mono.iter_mut() {
            if self.lookahead_pos >= fade_len {
                break;
            }
            *sample += self.lookahead[self.lookahead_pos] * fade_out_gain(self.lookahead_pos, fade_len);
            self.lookahead_pos += 1;
        }
    }
}

fn draw(pool: &[Arc<Segment>], selector: &mut ShuffleSelector) -> Option<Arc<Segment>> {
    if pool.is_empty() {
        return None;
    }
    let segment = Arc::clone(&pool[selector.next()]);
    segment.mark_played();
    Some(segment)
}

/// Advance `cursor` through the pool, writing mono samples into `out`.
fn render_stream(
    cursor: &mut Option<PlaybackCursor>,
    pool: &[Arc<Segment>],
    selector: &mut ShuffleSelector,
    out: &mut [f32],
) {
    let mut written = 0;

    while written < out.len() {
        if cursor.is_none() {
            match draw(pool, selector) {
                Some(segment) => *cursor = Some(PlaybackCursor::new(segment)),
                None => {
                    out[written..].fill(0.0);
                    return;
                }
            }
        }
        let Some(c) = cursor.as_mut() else {
            return;
        };

        let remaining = out.len() - written;
        let fade_start = c.current.fade_out_start();

        if c.offset < fade_start {
            let n = (fade_start - c.offset).min(remaining);
            let src = &c.current.pcm()[c.offset..c.offset + n];
            for (o, &s) in out[written..written + n].iter_mut().zip(src) {
                *o = s as f32;
            }
            c.offset += n;
            written += n;
            continue;
        }

        if c.next.is_none() {
            c.next = draw(pool, selector);
        }

        let n = (c.current.len() - c.offset).min(remaining);
        let j = c.offset - fade_start;
        let tail = &c.current.pcm()[c.offset..c.offset + n];
        let dst = &mut out[written..written + n];
        match &c.next {
            Some(next) => {
                let head = &next.pcm()[j..j + n];
                for ((o, &a), &b) in dst.iter_mut().zip(tail).zip(head) {
                    *o = a as f32 + b as f32;
                }
            }
            None => {
                for (o, &a) in dst.iter_mut().zip(tail) {
                    *o = a as f32;
                }
            }
        }
        c.offset += n;
        written += n;

        if c.offset == c.current.len() {
            match c.next.take() {
                Some(next) => {
                    c.offset = next.fade_len();
                    c.current = next;
                }
                None => *cursor = None,
            }
        }
    }
}

#[inline]
fn to_pcm(value: f32) -> i16 {
    value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
