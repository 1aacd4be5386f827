//! Synthesis progress: which stage the next segment belongs to.
//!
//! Synthesis starts with a few small segments for fast feedback, then moves
//! to large segments. The first large segments settle the volume needed to
//! avoid clipping; the remaining ones must fit under the settled ceiling.

use serde::{Deserialize, Serialize};

/// Stage of a synthesized segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// First small segment of a new envelope; replaces the pool abruptly.
    FirstSmall,
    /// Further small segments refining the current envelope.
    OtherSmall,
    /// First large segment; replaces the small segments without a crossfade jump.
    FirstVolume,
    /// Large segment that may still lower the global volume.
    OtherVolume,
    /// Large segment that settles the global volume for good.
    LastVolume,
    /// Large segment that must fit under the settled volume or be regenerated.
    Final,
}

impl Stage {
    pub fn is_small(&self) -> bool {
        matches!(self, Stage::FirstSmall | Stage::OtherSmall)
    }
}

/// Step layout of a full synthesis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
    pub small_steps: u32,
    pub volume_steps: u32,
    pub final_steps: u32,
}

impl StepPlan {
    pub fn total_steps(&self) -> u32 {
        self.small_steps + self.volume_steps + self.final_steps
    }

    pub fn large_steps(&self) -> u32 {
        self.volume_steps + self.final_steps
    }

    /// Stage of a given step, or `None` once the run is complete.
    pub fn stage_at(&self, step: u32) -> Option<Stage> {
        if step >= self.total_steps() {
            return None;
        }
        let stage = if step < self.small_steps {
            if step == 0 {
                Stage::FirstSmall
            } else {
                Stage::OtherSmall
            }
        } else if step < self.small_steps + self.volume_steps {
            let k = step - self.small_steps;
            if k == 0 {
                Stage::FirstVolume
            } else if k + 1 == self.volume_steps {
                Stage::LastVolume
            } else {
                Stage::OtherVolume
            }
        } else {
            Stage::Final
        };
        Some(stage)
    }
}

impl Default for StepPlan {
    fn default() -> Self {
        Self {
            small_steps: 4,
            volume_steps: 4,
            final_steps: 16,
        }
    }
}

/// Monotonic step counter over a [`StepPlan`].
#[derive(Debug, Clone)]
pub struct SynthesisProgress {
    plan: StepPlan,
    step: u32,
}

impl SynthesisProgress {
    pub fn new(plan: StepPlan) -> Self {
        Self { plan, step: 0 }
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn plan(&self) -> &StepPlan {
        &self.plan
    }

    pub fn stage(&self) -> Option<Stage> {
        self.plan.stage_at(self.step)
    }

    pub fn is_done(&self) -> bool {
        self.step >= self.plan.total_steps()
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Advance past an accepted segment.
    pub fn advance(&mut self) {
        if !self.is_done() {
            self.step += 1;
        }
    }

    /// `step * 100 / total`, so a finished run reports 100.
    pub fn percent(&self) -> i32 {
        (self.step * 100 / self.plan.total_steps().max(1)) as i32
    }

    /// Number of large steps completed so far.
    pub fn large_steps_done(&self) -> u32 {
        self.step.saturating_sub(self.plan.small_steps)
    }
}

impl Default for SynthesisProgress {
    fn default() -> Self {
        Self::new(StepPlan::default())
    }
}
