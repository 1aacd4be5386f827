//! Fairness-constrained shuffle over pool indices.
//!
//! Indices live in exactly one of four partitions:
//!
//! - **fresh**: never played, drawn first (LIFO)
//! - **draw pile**: eligible for a uniform random draw
//! - **feeder**: recently played, released into the draw pile one per draw
//! - **discard**: played during the current pass, in play order
//!
//! When the draw pile runs dry, the discard pile is split: its older part
//! becomes the new draw pile and its most recently played half waits in the
//! feeder. A played index therefore cannot recur until about half the pool
//! has been played again, without reshuffling everything each round.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub struct ShuffleSelector {
    fresh: Vec<usize>,
    draw: Vec<usize>,
    feeder: VecDeque<usize>,
    discard: Vec<usize>,
    rng: StdRng,
}

impl ShuffleSelector {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic selector for tests and offline rendering.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            fresh: Vec::new(),
            draw: Vec::new(),
            feeder: VecDeque::new(),
            discard: Vec::new(),
            rng,
        }
    }

    /// Add an index. Played indices wait in the discard pile.
    pub fn insert(&mut self, index: usize, played: bool) {
        if played {
            self.discard.push(index);
        } else {
            self.fresh.push(index);
        }
    }

    pub fn len(&self) -> usize {
        self.fresh.len() + self.draw.len() + self.feeder.len() + self.discard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.fresh.clear();
        self.draw.clear();
        self.feeder.clear();
        self.discard.clear();
    }

    /// Draw the next index to play.
    ///
    /// # Panics
    /// Panics when empty: the pool must never be drawn from before its
    /// first segment arrives.
    pub fn next(&mut self) -> usize {
        assert!(!self.is_empty(), "shuffle selector drawn while empty");

        if let Some(index) = self.fresh.pop() {
            self.discard.push(index);
            return index;
        }

        if self.draw.is_empty() {
            std::mem::swap(&mut self.draw, &mut self.discard);
            let held = self.draw.len() / 2;
            let split = self.draw.len() - held;
            self.feeder.extend(self.draw.drain(split..));

            if self.draw.is_empty() {
                if let Some(index) = self.feeder.pop_front() {
                    self.draw.push(index);
                }
            }
        }

        let slot = self.rng.gen_range(0..self.draw.len());
        let picked = match self.feeder.pop_front() {
            Some(released) => std::mem::replace(&mut self.draw[slot], released),
            None => self.draw.swap_remove(slot),
        };

        self.discard.push(picked);
        picked
    }
}

impl Default for ShuffleSelector {
    fn default() -> Self {
        Self::new()
    }
}
