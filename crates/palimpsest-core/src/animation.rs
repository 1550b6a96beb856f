#![forbid(unsafe_code)]

//! Animation: ordered keyframes plus the root-index coordinate systems.
//!
//! Three coordinate systems address a position in the timeline:
//!
//! - **keyframe index**: position in [`Animation::keyframes`].
//! - **root index**: absolute position counting loop repeats,
//!   `loop * frame_count + keyframe_index`, in `[0, root_count)`.
//! - **root inter index**: like the root index, but every keyframe linked to
//!   its next neighbour also owns `interpolation` in-between frames.
//!
//! ```text
//! keyframes:   k0        k1   k2          (k0 linked to next, interpolation = 2)
//! inter:       0  1  2   3    4   | 5 6 7  8  9   (second loop)
//! root:        0         1    2   | 3      4  5
//! ```
//!
//! # Invariants
//!
//! 1. `root_index < root_count()` whenever the animation has keyframes, and
//!    `root_index == 0` otherwise.
//! 2. `root_index_of(index_at_root(r), loop_at_root(r)) == r` for every
//!    `r < root_count()`.
//! 3. All conversions are total: an empty animation maps everything to 0.

use serde::{Deserialize, Serialize};

use crate::keyframe::Keyframe;

/// Timing options of the whole animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationOption {
    /// How many times the keyframe sequence repeats in the root timeline.
    pub loop_count: usize,
    /// In-between frames generated after each keyframe linked to its next one.
    pub interpolation: usize,
}

impl Default for AnimationOption {
    fn default() -> Self {
        Self {
            loop_count: 1,
            interpolation: 0,
        }
    }
}

/// Ordered keyframes, timing options and the current play/edit position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Animation {
    pub keyframes: Vec<Keyframe>,
    pub option: AnimationOption,
    root_index: usize,
}

impl Animation {
    #[must_use]
    pub fn new(keyframes: Vec<Keyframe>) -> Self {
        Self {
            keyframes,
            option: AnimationOption::default(),
            root_index: 0,
        }
    }

    // ====================================================================
    // Counts
    // ====================================================================

    /// Number of keyframes.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.keyframes.len()
    }

    #[must_use]
    pub fn loop_count(&self) -> usize {
        self.option.loop_count.max(1)
    }

    /// Number of root positions: keyframes times loops.
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.frame_count() * self.loop_count()
    }

    /// Frames owned by keyframe `index` in the inter space.
    #[must_use]
    pub fn inter_span(&self, index: usize) -> usize {
        match self.keyframes.get(index) {
            Some(k) if k.option.previous_next.has_next() => 1 + self.option.interpolation,
            Some(_) => 1,
            None => 0,
        }
    }

    fn cycle_inter_count(&self) -> usize {
        (0..self.frame_count()).map(|i| self.inter_span(i)).sum()
    }

    /// Number of inter positions over all loops.
    #[must_use]
    pub fn inter_count(&self) -> usize {
        self.cycle_inter_count() * self.loop_count()
    }

    // ====================================================================
    // Conversions
    // ====================================================================

    /// Keyframe index shown at root index `root`.
    #[must_use]
    pub fn index_at_root(&self, root: usize) -> usize {
        let n = self.frame_count();
        if n == 0 { 0 } else { root % n }
    }

    /// Loop repeat shown at root index `root`.
    #[must_use]
    pub fn loop_at_root(&self, root: usize) -> usize {
        let n = self.frame_count();
        if n == 0 {
            0
        } else {
            (root % self.root_count()) / n
        }
    }

    /// Root index of keyframe `index` in loop repeat `loop_index`.
    #[must_use]
    pub fn root_index_of(&self, index: usize, loop_index: usize) -> usize {
        loop_index * self.frame_count() + index
    }

    /// Keyframe index owning inter frame `inter`.
    #[must_use]
    pub fn index_at_root_inter(&self, inter: usize) -> usize {
        let cycle = self.cycle_inter_count();
        if cycle == 0 {
            return 0;
        }
        let mut local = inter % cycle;
        for i in 0..self.frame_count() {
            let span = self.inter_span(i);
            if local < span {
                return i;
            }
            local -= span;
        }
        self.frame_count() - 1
    }

    /// Root index of the keyframe owning inter frame `inter`, in the same loop.
    #[must_use]
    pub fn root_index_at_root_inter(&self, inter: usize) -> usize {
        let cycle = self.cycle_inter_count();
        if cycle == 0 {
            return 0;
        }
        let loop_index = (inter % self.inter_count()) / cycle;
        self.root_index_of(self.index_at_root_inter(inter), loop_index)
    }

    /// First inter frame of root index `root`.
    #[must_use]
    pub fn root_inter_index_at_root(&self, root: usize) -> usize {
        let index = self.index_at_root(root);
        let before: usize = (0..index).map(|i| self.inter_span(i)).sum();
        self.loop_at_root(root) * self.cycle_inter_count() + before
    }

    // ====================================================================
    // Root index
    // ====================================================================

    /// Current play/edit position.
    #[must_use]
    pub fn root_index(&self) -> usize {
        self.root_index
    }

    /// Keyframe shown at the current root index.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.index_at_root(self.root_index)
    }

    /// Set the root index, clamped into `[0, root_count)`.
    pub fn set_root_index(&mut self, root: usize) {
        self.root_index = root.min(self.root_count().saturating_sub(1));
    }

    /// Re-establish the root index invariant after the counts changed.
    pub fn clamp_root_index(&mut self) {
        self.set_root_index(self.root_index);
    }

    /// Shift the root index after keyframes were inserted.
    ///
    /// `old_frame_count` is the keyframe count before insertion and
    /// `positions` the final positions of the inserted keyframes, ascending.
    /// The keyframe part moves up by one for every insertion at or before it;
    /// the loop part is preserved.
    pub fn shift_root_for_insert(&mut self, old_frame_count: usize, positions: &[usize]) {
        let (mut index, loop_index) = decompose(self.root_index, old_frame_count);
        for &p in positions {
            if index >= p {
                index += 1;
            }
        }
        let index = index.min(self.frame_count().saturating_sub(1));
        self.set_root_index(self.root_index_of(index, loop_index));
    }

    /// Shift the root index after the keyframes at `removed` (pre-removal
    /// indices) were removed.
    pub fn shift_root_for_remove(&mut self, old_frame_count: usize, removed: &[usize]) {
        let (index, loop_index) = decompose(self.root_index, old_frame_count);
        let below = removed.iter().filter(|&&i| i < index).count();
        let index = (index - below).min(self.frame_count().saturating_sub(1));
        self.set_root_index(self.root_index_of(index, loop_index));
    }

    /// Whether keyframe beats are non-decreasing.
    #[must_use]
    pub fn beats_are_sorted(&self) -> bool {
        self.keyframes
            .windows(2)
            .all(|w| w[0].option.beat <= w[1].option.beat)
    }
}

fn decompose(root: usize, frame_count: usize) -> (usize, usize) {
    if frame_count == 0 {
        (0, 0)
    } else {
        (root % frame_count, root / frame_count)
    }
}
