//! Segment pool leveler.
//!
//! The leveler owns the float source of every pooled segment and the global
//! volume factor. It runs on the synthesizer thread as the pool's only
//! writer and publishes membership changes to the mixer as [`PoolUpdate`]
//! messages carrying shared [`Segment`] handles.
//!
//! Contract: every published segment's peak times the current volume factor
//! stays at or under [`CLIP_THRESHOLD`].

use crate::progress::Stage;
use crate::segment::{
    peak_amplitude, volume_factor_for_peak, Segment, CLIP_THRESHOLD, DEFAULT_VOLUME_FACTOR,
};
use crossbeam_channel::Sender;
use std::sync::Arc;

/// Pool membership change, consumed by the mixer at its next fill.
#[derive(Debug, Clone)]
pub enum PoolUpdate {
    /// Drop the current pool and play these segments instead.
    ///
    /// The first segment is the pioneer. When `abrupt` is set the mixer
    /// captures a lookahead of the old stream and crossfades against it.
    Replace {
        segments: Vec<Arc<Segment>>,
        abrupt: bool,
    },
    /// Grow the current pool.
    Append(Arc<Segment>),
}

/// Result of offering a segment to the leveler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Accepted,
    /// The segment would clip under the settled volume; regenerate it.
    Rejected,
}

/// What a stage asks of the leveler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelAction {
    Pioneer { abrupt: bool },
    Adapt,
    Finalize,
    NoClip,
}

impl From<Stage> for LevelAction {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::FirstSmall => LevelAction::Pioneer { abrupt: true },
            Stage::FirstVolume => LevelAction::Pioneer { abrupt: false },
            Stage::OtherSmall | Stage::OtherVolume => LevelAction::Adapt,
            Stage::LastVolume => LevelAction::Finalize,
            Stage::Final => LevelAction::NoClip,
        }
    }
}

struct Member {
    /// Released once the volume is settled.
    source: Option<Vec<f32>>,
    peak: f32,
    segment: Arc<Segment>,
}

pub struct Leveler {
    members: Vec<Member>,
    volume_factor: f32,
    frozen: bool,
    fade_len: usize,
    updates: Sender<PoolUpdate>,
}

impl Leveler {
    pub fn new(fade_len: usize, updates: Sender<PoolUpdate>) -> Self {
        Self {
            members: Vec::new(),
            volume_factor: DEFAULT_VOLUME_FACTOR,
            frozen: false,
            fade_len,
            updates,
        }
    }

    /// Offer a freshly synthesized segment of the given stage.
    pub fn handle_chunk(&mut self, samples: Vec<f32>, stage: Stage) -> ChunkOutcome {
        let peak = peak_amplitude(&samples);

        match LevelAction::from(stage) {
            LevelAction::Pioneer { abrupt } => {
                self.volume_factor = volume_factor_for_peak(peak);
                self.frozen = false;
                let pioneer = self.member(samples, peak, false);
                let segments = vec![Arc::clone(&pioneer.segment)];
                self.members = vec![pioneer];
                tracing::debug!(
                    abrupt,
                    volume_factor = self.volume_factor,
                    "pioneer segment replaces pool"
                );
                self.publish(PoolUpdate::Replace { segments, abrupt });
            }
            LevelAction::Adapt => {
                if self.would_clip(peak) {
                    self.change_volume(samples, peak, peak);
                } else {
                    self.append(samples, peak);
                }
            }
            LevelAction::Finalize => {
                let max_peak = self.members.iter().map(|m| m.peak).fold(peak, f32::max);
                if self.would_clip(max_peak) {
                    self.change_volume(samples, peak, max_peak);
                } else {
                    self.append(samples, peak);
                }
                for member in &mut self.members {
                    member.source = None;
                }
                self.frozen = true;
                tracing::debug!(
                    volume_factor = self.volume_factor,
                    members = self.members.len(),
                    "volume settled"
                );
            }
            LevelAction::NoClip => {
                if self.would_clip(peak) {
                    tracing::debug!(peak, "segment would clip under settled volume, rejected");
                    return ChunkOutcome::Rejected;
                }
                self.append(samples, peak);
            }
        }

        ChunkOutcome::Accepted
    }

    pub fn volume_factor(&self) -> f32 {
        self.volume_factor
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of members still holding float samples.
    pub fn sources_held(&self) -> usize {
        self.members.iter().filter(|m| m.source.is_some()).count()
    }

    /// Largest scaled peak in the pool.
    pub fn max_scaled_peak(&self) -> f32 {
        self.members
            .iter()
            .map(|m| m.peak * self.volume_factor)
            .fold(0.0, f32::max)
    }

    fn would_clip(&self, peak: f32) -> bool {
        peak * self.volume_factor > CLIP_THRESHOLD
    }

    fn member(&self, samples: Vec<f32>, peak: f32, played: bool) -> Member {
        let segment = Segment::rerender(&samples, self.volume_factor, self.fade_len, played);
        Member {
            source: Some(samples),
            peak,
            segment: Arc::new(segment),
        }
    }

    fn append(&mut self, samples: Vec<f32>, peak: f32) {
        let member = self.member(samples, peak, false);
        let segment = Arc::clone(&member.segment);
        self.members.push(member);
        self.publish(PoolUpdate::Append(segment));
    }

    /// Lower the volume to fit `reference_peak`, make this segment the
    /// pioneer and re-add every rescalable member, never-played ones first.
    fn change_volume(&mut self, samples: Vec<f32>, peak: f32, reference_peak: f32) {
        let previous = self.volume_factor;
        self.volume_factor = volume_factor_for_peak(reference_peak);
        tracing::info!(
            from = previous,
            to = self.volume_factor,
            "global volume change"
        );

        let pioneer = self.member(samples, peak, false);
        let old = std::mem::replace(&mut self.members, vec![pioneer]);
        let (played, unplayed): (Vec<Member>, Vec<Member>) =
            old.into_iter().partition(|m| m.segment.was_played());

        for member in unplayed.into_iter().chain(played) {
            let Some(source) = member.source else {
                tracing::debug!("dropping settled segment without float source");
                continue;
            };
            let rescaled = self.member(source, member.peak, member.segment.was_played());
            self.members.push(rescaled);
        }

        let segments = self
            .members
            .iter()
            .map(|m| Arc::clone(&m.segment))
            .collect();
        self.publish(PoolUpdate::Replace {
            segments,
            abrupt: false,
        });
    }

    fn publish(&self, update: PoolUpdate) {
        if self.updates.send(update).is_err() {
            tracing::debug!("mixer gone, pool update dropped");
        }
    }
}
