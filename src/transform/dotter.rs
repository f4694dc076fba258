//! Dotted rhythms.
//!
//! A pair `(i, i + 1)` is eligible when both entries are plain notes in the
//! same measure. The first note is dotted (×1.5) and the second dedotted
//! (×0.5), so the pair still fills two note lengths and measures stay
//! aligned. A note already in a pair is never considered again.

use super::{DotterKind, Stage, MIN_TRANSFORM_LEN};
use crate::sample::{Entry, Sample};
use rand::{Rng, RngCore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DotPolicy {
    Never,
    /// Dot every eligible pair, scanning left to right.
    Every,
    /// Dot each eligible pair with this probability.
    Random { chance: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dotter {
    pub policy: DotPolicy,
}

impl Dotter {
    pub fn preset(kind: DotterKind) -> Self {
        let policy = match kind {
            DotterKind::None => DotPolicy::Never,
            DotterKind::Every => DotPolicy::Every,
            DotterKind::Random => DotPolicy::Random { chance: 0.5 },
        };
        Self { policy }
    }

    fn eligible(sample: &Sample, index: usize) -> bool {
        let per_measure = sample.notes_per_measure();
        if sample.measure_position(index) + 1 >= per_measure {
            return false;
        }
        let entries = sample.entries();
        let plain = |entry: &Entry| entry.as_note().map_or(false, |n| n.is_plain());
        index + 1 < entries.len() && plain(&entries[index]) && plain(&entries[index + 1])
    }
}

impl Stage for Dotter {
    fn name(&self) -> &'static str {
        "dotter"
    }

    fn apply(&self, sample: &mut Sample, rng: &mut dyn RngCore) {
        if sample.len() < MIN_TRANSFORM_LEN || self.policy == DotPolicy::Never {
            return;
        }

        let mut index = 0;
        while index + 1 < sample.len() {
            if !Self::eligible(sample, index) {
                index += 1;
                continue;
            }
            let dot = match self.policy {
                DotPolicy::Never => false,
                DotPolicy::Every => true,
                DotPolicy::Random { chance } => rng.gen_bool(chance.clamp(0.0, 1.0)),
            };
            if !dot {
                index += 1;
                continue;
            }
            let entries = sample.entries_mut();
            if let Some(first) = entries[index].as_note_mut() {
                first.dot = true;
            }
            if let Some(second) = entries[index + 1].as_note_mut() {
                second.dedot = true;
            }
            index += 2;
        }
    }
}
