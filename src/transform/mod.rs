//! # Transform Pipeline
//!
//! Turns a freshly built [`Sample`] into something less mechanical than a
//! straight scale. Three stages run in a fixed order:
//!
//! 1. **Shuffler** - weighted fill/start/end substitutions around a base shuffle
//! 2. **Dotter** - pairs adjacent notes into dotted/dedotted rhythms
//! 3. **Velociter** - assigns velocities, flat, random or by beat position
//!
//! Each stage implements [`Stage`] and can be swapped independently. Stages
//! mutate the sample they are handed and keep no reference to it. Samples
//! with fewer than 3 entries pass through untouched, and rests/holds are
//! never given dots or velocities.
//!
//! ## Sub-modules
//! - `shuffler` - weighted tables, substitutions, bounded Fisher–Yates
//! - `dotter` - dot/dedot pairing inside measures
//! - `velociter` - velocity policies and beat roles
//!
//! ## Example
//! ```rust
//! use rand::SeedableRng;
//! use rand_pcg::Pcg32;
//! use tonal_sampler::transform::{DotterKind, Pipeline, ShufflerKind, VelociterKind};
//! use tonal_sampler::{generate, BeatUnit, GenerateOptions, Sample};
//!
//! let tonal = generate(0, &GenerateOptions::default())?;
//! let mut sample = Sample::build(&tonal, BeatUnit::Quarter, None, None);
//! let pipeline = Pipeline::from_kinds(ShufflerKind::KeepTonic, DotterKind::Every, VelociterKind::Metric);
//! pipeline.apply(&mut sample, &mut Pcg32::seed_from_u64(7));
//!
//! assert_eq!(sample.len(), 8);
//! assert_eq!(sample.entries()[0].as_note().unwrap().note(), tonal.tonic());
//! # Ok::<(), tonal_sampler::SamplerError>(())
//! ```

mod dotter;
mod shuffler;
mod velociter;

pub use dotter::{DotPolicy, Dotter};
pub use shuffler::{fisher_yates, ShuffleBounds, Shuffler, Substitution, TableKey, WeightedTable};
pub use velociter::{beat_role, BeatRole, Velociter, VelocityPolicy};

use crate::error::SamplerError;
use crate::sample::Sample;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Samples shorter than this pass through every stage untouched.
pub const MIN_TRANSFORM_LEN: usize = 3;

/// One pluggable transform over a sample.
pub trait Stage {
    fn name(&self) -> &'static str;

    fn apply(&self, sample: &mut Sample, rng: &mut dyn RngCore);
}

/// Named shuffler presets selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShufflerKind {
    #[default]
    None,
    Full,
    KeepTonic,
    Bookends,
    Sprinkle,
    TailSwap,
}

/// Named dotter presets selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotterKind {
    #[default]
    None,
    Every,
    Random,
}

/// Named velociter presets selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VelociterKind {
    #[default]
    Flat,
    Random,
    Metric,
}

impl ShufflerKind {
    pub fn from_str(s: &str) -> Result<Self, SamplerError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ShufflerKind::None),
            "full" => Ok(ShufflerKind::Full),
            "keep-tonic" => Ok(ShufflerKind::KeepTonic),
            "bookends" => Ok(ShufflerKind::Bookends),
            "sprinkle" => Ok(ShufflerKind::Sprinkle),
            "tail-swap" => Ok(ShufflerKind::TailSwap),
            other => Err(SamplerError::invalid(format!("unknown shuffler '{}'", other))),
        }
    }
}

impl DotterKind {
    pub fn from_str(s: &str) -> Result<Self, SamplerError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(DotterKind::None),
            "every" => Ok(DotterKind::Every),
            "random" => Ok(DotterKind::Random),
            other => Err(SamplerError::invalid(format!("unknown dotter '{}'", other))),
        }
    }
}

impl VelociterKind {
    pub fn from_str(s: &str) -> Result<Self, SamplerError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(VelociterKind::Flat),
            "random" => Ok(VelociterKind::Random),
            "metric" => Ok(VelociterKind::Metric),
            other => Err(SamplerError::invalid(format!("unknown velociter '{}'", other))),
        }
    }
}

/// Shuffle, dot, then assign velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub shuffler: Shuffler,
    pub dotter: Dotter,
    pub velociter: Velociter,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::from_kinds(ShufflerKind::None, DotterKind::None, VelociterKind::Flat)
    }
}

impl Pipeline {
    pub fn from_kinds(shuffler: ShufflerKind, dotter: DotterKind, velociter: VelociterKind) -> Self {
        Self {
            shuffler: Shuffler::preset(shuffler),
            dotter: Dotter::preset(dotter),
            velociter: Velociter::preset(velociter),
        }
    }

    pub fn stages(&self) -> [&dyn Stage; 3] {
        [&self.shuffler, &self.dotter, &self.velociter]
    }

    pub fn apply(&self, sample: &mut Sample, rng: &mut dyn RngCore) {
        for stage in self.stages() {
            stage.apply(sample, rng);
            log::trace!("applied {} to sample #{}", stage.name(), sample.counter());
        }
    }
}
