//! Velocity assignment.

use super::{Stage, VelociterKind, MIN_TRANSFORM_LEN};
use crate::sample::Sample;
use rand::{Rng, RngCore};

const DOWNBEAT: f64 = 1.0;
const MIDBEAT: f64 = 0.85;
const PICKUP: f64 = 0.7;
const OFFBEATS: [f64; 2] = [0.6, 0.75];

/// Where a position falls inside its measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatRole {
    Downbeat,
    /// Secondary accent halfway through an even measure.
    Midbeat,
    /// Last position, leading into the next measure.
    Pickup,
    Other,
}

/// Role of `position` in a measure of `per_measure` notes.
pub fn beat_role(position: usize, per_measure: usize) -> BeatRole {
    if position == 0 {
        BeatRole::Downbeat
    } else if per_measure >= 4 && per_measure % 2 == 0 && position == per_measure / 2 {
        BeatRole::Midbeat
    } else if position + 1 == per_measure {
        BeatRole::Pickup
    } else {
        BeatRole::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityPolicy {
    /// Leave velocities as built.
    Flat,
    Random { min: f64, max: f64 },
    /// Accent by beat role; unaccented positions alternate two levels.
    Metric,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velociter {
    pub policy: VelocityPolicy,
}

impl Velociter {
    pub fn preset(kind: VelociterKind) -> Self {
        let policy = match kind {
            VelociterKind::Flat => VelocityPolicy::Flat,
            VelociterKind::Random => VelocityPolicy::Random { min: 0.4, max: 1.0 },
            VelociterKind::Metric => VelocityPolicy::Metric,
        };
        Self { policy }
    }
}

impl Stage for Velociter {
    fn name(&self) -> &'static str {
        "velociter"
    }

    fn apply(&self, sample: &mut Sample, rng: &mut dyn RngCore) {
        if sample.len() < MIN_TRANSFORM_LEN || self.policy == VelocityPolicy::Flat {
            return;
        }
        let per_measure = sample.notes_per_measure();
        let mut offbeat = 0;

        for (index, entry) in sample.entries_mut().iter_mut().enumerate() {
            let Some(note) = entry.as_note_mut() else {
                continue;
            };
            match self.policy {
                VelocityPolicy::Flat => {}
                VelocityPolicy::Random { min, max } => {
                    note.velocity = if max > min { rng.gen_range(min..=max) } else { min };
                }
                VelocityPolicy::Metric => {
                    note.velocity = match beat_role(index % per_measure, per_measure) {
                        BeatRole::Downbeat => DOWNBEAT,
                        BeatRole::Midbeat => MIDBEAT,
                        BeatRole::Pickup => PICKUP,
                        BeatRole::Other => {
                            let v = OFFBEATS[offbeat % OFFBEATS.len()];
                            offbeat += 1;
                            v
                        }
                    };
                }
            }
        }
    }
}
