//! # Sampler Configuration
//!
//! A typed configuration struct with one validating setter per field. Every
//! setter reports how the change should be handled by a running scheduler:
//!
//! - [`ParamChange::Structural`] - the scale itself must be regenerated
//!   (tonic, tonality, direction, octave, span, arpeggio, clipping)
//! - [`ParamChange::Cosmetic`] - only scheduling or the transform pipeline
//!   is affected; `reset_counter` is set when the shuffler selection changed
//!
//! Configuration can be built three ways:
//! - typed setters (`set_bpm`, `set_tonality`, ...)
//! - the flat key/value surface, [`SamplerConfig::apply`]
//! - a YAML document, [`SamplerConfig::from_yaml`]
//!
//! ## YAML Format
//! ```yaml
//! tonic: F#            # degree 0-11 or a note name
//! tonality: dorian
//! direction: ascend-descend
//! octave: 4
//! octave-span: 2
//! use-arpeggio: false
//! beat-unit: 1/8
//! bpm: 96
//! loop: true
//! rebuild-every: 2
//! shuffler: keep-tonic
//! dotter: random
//! velociter: metric
//! time-signature: 3/4  # or "auto"
//! seed: 42
//! ```
//!
//! ## Example
//! ```rust
//! use tonal_sampler::{ParamChange, SamplerConfig, Tonality};
//!
//! let mut config = SamplerConfig::from_yaml("tonic: 9\ntonality: minor\nbpm: 90\n")?;
//! assert_eq!(config.tonality(), Tonality::Minor);
//!
//! assert_eq!(config.apply("octave", "3")?, ParamChange::Structural);
//! assert_eq!(config.apply("shuffler", "full")?, ParamChange::Cosmetic { reset_counter: true });
//! assert!(config.apply("bpm", "500").is_err());
//! # Ok::<(), tonal_sampler::SamplerError>(())
//! ```

use crate::error::SamplerError;
use crate::note::OCTAVES;
use crate::sample::{BeatUnit, TimeSignature, TonalSample};
use crate::scale::{generate, GenerateOptions};
use crate::tonality::{Direction, Tonality};
use crate::transform::{DotterKind, Pipeline, ShufflerKind, VelociterKind};
use serde::{Deserialize, Serialize};

pub const MIN_BPM: f64 = 30.0;
pub const MAX_BPM: f64 = 300.0;

/// How a configuration change affects a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamChange {
    /// Regenerate the scale and restart playback from now.
    Structural,
    /// Takes effect from the next unscheduled note.
    Cosmetic { reset_counter: bool },
}

impl ParamChange {
    const COSMETIC: ParamChange = ParamChange::Cosmetic { reset_counter: false };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplerConfig {
    tonic: u8,
    tonality: Tonality,
    direction: Direction,
    octave: u8,
    octave_span: u8,
    use_arpeggio: bool,
    clip_to_range: bool,
    beat_unit: BeatUnit,
    bpm: f64,
    #[serde(rename = "loop")]
    looping: bool,
    rebuild_every: u32,
    shuffler: ShufflerKind,
    dotter: DotterKind,
    velociter: VelociterKind,
    time_signature: Option<TimeSignature>,
    seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            tonic: 0,
            tonality: Tonality::Major,
            direction: Direction::Ascend,
            octave: 4,
            octave_span: 1,
            use_arpeggio: false,
            clip_to_range: false,
            beat_unit: BeatUnit::Quarter,
            bpm: 120.0,
            looping: true,
            rebuild_every: 0,
            shuffler: ShufflerKind::None,
            dotter: DotterKind::None,
            velociter: VelociterKind::Flat,
            time_signature: None,
            seed: 0,
        }
    }
}

/// Tonic given either as a degree or as a note name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTonic {
    Degree(u8),
    Name(String),
}

/// Configuration document as written; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    tonic: Option<RawTonic>,
    tonality: Option<String>,
    direction: Option<String>,
    octave: Option<u8>,
    octave_span: Option<u8>,
    use_arpeggio: Option<bool>,
    clip_to_range: Option<bool>,
    beat_unit: Option<String>,
    bpm: Option<f64>,
    #[serde(rename = "loop")]
    looping: Option<bool>,
    rebuild_every: Option<u32>,
    shuffler: Option<String>,
    dotter: Option<String>,
    velociter: Option<String>,
    time_signature: Option<String>,
    seed: Option<u64>,
}

impl SamplerConfig {
    /// Parse a YAML document. Missing fields keep their defaults.
    ///
    /// # Errors
    /// `ConfigError` when the document is not valid YAML or has unknown or
    /// mistyped fields; `InvalidArgument` when a value fails validation.
    pub fn from_yaml(content: &str) -> Result<Self, SamplerError> {
        let raw: RawConfig = if content.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| SamplerError::ConfigError(e.to_string()))?
        };

        let mut config = Self::default();
        if let Some(tonic) = raw.tonic {
            let degree = match tonic {
                RawTonic::Degree(d) => d,
                RawTonic::Name(name) => parse_tonic(&name)?,
            };
            config.set_tonic(degree)?;
        }
        if let Some(tonality) = &raw.tonality {
            config.set_tonality(parse_tonality(tonality)?);
        }
        if let Some(direction) = &raw.direction {
            config.set_direction(parse_direction(direction)?);
        }
        if let Some(octave) = raw.octave {
            config.set_octave(octave)?;
        }
        if let Some(span) = raw.octave_span {
            config.set_octave_span(span)?;
        }
        if let Some(flag) = raw.use_arpeggio {
            config.set_use_arpeggio(flag);
        }
        if let Some(flag) = raw.clip_to_range {
            config.set_clip_to_range(flag);
        }
        if let Some(unit) = &raw.beat_unit {
            config.set_beat_unit(parse_beat_unit(unit)?);
        }
        if let Some(bpm) = raw.bpm {
            config.set_bpm(bpm)?;
        }
        if let Some(flag) = raw.looping {
            config.set_loop(flag);
        }
        if let Some(every) = raw.rebuild_every {
            config.set_rebuild_every(every);
        }
        if let Some(shuffler) = &raw.shuffler {
            config.set_shuffler(ShufflerKind::from_str(shuffler)?);
        }
        if let Some(dotter) = &raw.dotter {
            config.set_dotter(DotterKind::from_str(dotter)?);
        }
        if let Some(velociter) = &raw.velociter {
            config.set_velociter(VelociterKind::from_str(velociter)?);
        }
        if let Some(signature) = &raw.time_signature {
            config.set_time_signature(parse_time_signature(signature)?);
        }
        if let Some(seed) = raw.seed {
            config.set_seed(seed);
        }
        Ok(config)
    }

    /// Apply one entry of the flat key/value surface.
    ///
    /// Keys are kebab-case (`octave-span`); camelCase (`octaveSpan`) is
    /// accepted too. On error the configuration is unchanged.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<ParamChange, SamplerError> {
        let value = value.trim();
        match normalize_key(key).as_str() {
            "tonic" => self.set_tonic(parse_tonic(value)?),
            "tonality" => Ok(self.set_tonality(parse_tonality(value)?)),
            "direction" => Ok(self.set_direction(parse_direction(value)?)),
            "octave" => self.set_octave(parse_number(key, value)?),
            "octave-span" => self.set_octave_span(parse_number(key, value)?),
            "use-arpeggio" => Ok(self.set_use_arpeggio(parse_bool(key, value)?)),
            "clip-to-range" => Ok(self.set_clip_to_range(parse_bool(key, value)?)),
            "beat-unit" => Ok(self.set_beat_unit(parse_beat_unit(value)?)),
            "bpm" => self.set_bpm(parse_number(key, value)?),
            "loop" => Ok(self.set_loop(parse_bool(key, value)?)),
            "rebuild-every" => Ok(self.set_rebuild_every(parse_number(key, value)?)),
            "shuffler" => Ok(self.set_shuffler(ShufflerKind::from_str(value)?)),
            "dotter" => Ok(self.set_dotter(DotterKind::from_str(value)?)),
            "velociter" => Ok(self.set_velociter(VelociterKind::from_str(value)?)),
            "time-signature" => Ok(self.set_time_signature(parse_time_signature(value)?)),
            "seed" => Ok(self.set_seed(parse_number(key, value)?)),
            other => Err(SamplerError::invalid(format!("unknown configuration key '{}'", other))),
        }
    }

    pub fn set_tonic(&mut self, degree: u8) -> Result<ParamChange, SamplerError> {
        if degree >= 12 {
            return Err(SamplerError::invalid(format!("tonic degree {} is outside 0-11", degree)));
        }
        self.tonic = degree;
        Ok(ParamChange::Structural)
    }

    pub fn set_tonality(&mut self, tonality: Tonality) -> ParamChange {
        self.tonality = tonality;
        ParamChange::Structural
    }

    pub fn set_direction(&mut self, direction: Direction) -> ParamChange {
        self.direction = direction;
        ParamChange::Structural
    }

    pub fn set_octave(&mut self, octave: u8) -> Result<ParamChange, SamplerError> {
        if octave as usize >= OCTAVES {
            return Err(SamplerError::invalid(format!(
                "octave {} is outside 0-{}",
                octave,
                OCTAVES - 1
            )));
        }
        self.octave = octave;
        Ok(ParamChange::Structural)
    }

    pub fn set_octave_span(&mut self, span: u8) -> Result<ParamChange, SamplerError> {
        if span == 0 {
            return Err(SamplerError::invalid("octave span must be at least 1"));
        }
        self.octave_span = span;
        Ok(ParamChange::Structural)
    }

    pub fn set_use_arpeggio(&mut self, flag: bool) -> ParamChange {
        self.use_arpeggio = flag;
        ParamChange::Structural
    }

    pub fn set_clip_to_range(&mut self, flag: bool) -> ParamChange {
        self.clip_to_range = flag;
        ParamChange::Structural
    }

    pub fn set_beat_unit(&mut self, unit: BeatUnit) -> ParamChange {
        self.beat_unit = unit;
        ParamChange::COSMETIC
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<ParamChange, SamplerError> {
        if !bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(SamplerError::invalid(format!(
                "bpm {} is outside {}-{}",
                bpm, MIN_BPM, MAX_BPM
            )));
        }
        self.bpm = bpm;
        Ok(ParamChange::COSMETIC)
    }

    pub fn set_loop(&mut self, flag: bool) -> ParamChange {
        self.looping = flag;
        ParamChange::COSMETIC
    }

    /// Rebuild the sample every `every` passes; 0 builds it only once.
    pub fn set_rebuild_every(&mut self, every: u32) -> ParamChange {
        self.rebuild_every = every;
        ParamChange::COSMETIC
    }

    pub fn set_shuffler(&mut self, kind: ShufflerKind) -> ParamChange {
        let reset_counter = self.shuffler != kind;
        self.shuffler = kind;
        ParamChange::Cosmetic { reset_counter }
    }

    pub fn set_dotter(&mut self, kind: DotterKind) -> ParamChange {
        self.dotter = kind;
        ParamChange::COSMETIC
    }

    pub fn set_velociter(&mut self, kind: VelociterKind) -> ParamChange {
        self.velociter = kind;
        ParamChange::COSMETIC
    }

    /// `None` infers the signature from each sample's length.
    pub fn set_time_signature(&mut self, signature: Option<TimeSignature>) -> ParamChange {
        self.time_signature = signature;
        ParamChange::COSMETIC
    }

    pub fn set_seed(&mut self, seed: u64) -> ParamChange {
        self.seed = seed;
        ParamChange::COSMETIC
    }

    pub fn tonic(&self) -> u8 {
        self.tonic
    }

    pub fn tonality(&self) -> Tonality {
        self.tonality
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    pub fn octave_span(&self) -> u8 {
        self.octave_span
    }

    pub fn use_arpeggio(&self) -> bool {
        self.use_arpeggio
    }

    pub fn clip_to_range(&self) -> bool {
        self.clip_to_range
    }

    pub fn beat_unit(&self) -> BeatUnit {
        self.beat_unit
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn rebuild_every(&self) -> u32 {
        self.rebuild_every
    }

    pub fn shuffler(&self) -> ShufflerKind {
        self.shuffler
    }

    pub fn dotter(&self) -> DotterKind {
        self.dotter
    }

    pub fn velociter(&self) -> VelociterKind {
        self.velociter
    }

    pub fn time_signature(&self) -> Option<TimeSignature> {
        self.time_signature
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            tonality: self.tonality,
            octave: self.octave,
            direction: self.direction,
            octave_span: self.octave_span,
            use_arpeggio: self.use_arpeggio,
            clip_to_range: self.clip_to_range,
        }
    }

    /// Run the scale generator with the current structural settings.
    pub fn generate(&self) -> Result<TonalSample, SamplerError> {
        generate(self.tonic, &self.generate_options())
    }

    pub fn pipeline(&self) -> Pipeline {
        Pipeline::from_kinds(self.shuffler, self.dotter, self.velociter)
    }

    /// Seconds per plain note at the current tempo.
    pub fn note_seconds(&self) -> f64 {
        self.beat_unit.seconds_at(self.bpm)
    }
}

/// `octaveSpan` → `octave-span`; `octave_span` → `octave-span`.
fn normalize_key(key: &str) -> String {
    let mut normalized = String::with_capacity(key.len() + 4);
    for c in key.trim().chars() {
        if c.is_ascii_uppercase() {
            normalized.push('-');
            normalized.push(c.to_ascii_lowercase());
        } else if c == '_' {
            normalized.push('-');
        } else {
            normalized.push(c);
        }
    }
    normalized
}

/// Degree number (`"6"`) or note name (`"F#"`, `"F♯"`, `"Gb"`, `"G♭"`).
pub fn parse_tonic(s: &str) -> Result<u8, SamplerError> {
    let s = s.trim();
    if let Ok(degree) = s.parse::<u8>() {
        return if degree < 12 {
            Ok(degree)
        } else {
            Err(SamplerError::invalid(format!("tonic degree {} is outside 0-11", degree)))
        };
    }

    let mut chars = s.chars();
    let base: i32 = match chars.next().map(|c| c.to_ascii_uppercase()) {
        Some('C') => 0,
        Some('D') => 2,
        Some('E') => 4,
        Some('F') => 5,
        Some('G') => 7,
        Some('A') => 9,
        Some('B') => 11,
        _ => return Err(SamplerError::invalid(format!("invalid tonic '{}'", s))),
    };
    let mut offset = 0;
    for c in chars {
        match c {
            '#' | '♯' => offset += 1,
            'b' | '♭' => offset -= 1,
            _ => return Err(SamplerError::invalid(format!("invalid tonic '{}'", s))),
        }
    }
    Ok((base + offset).rem_euclid(12) as u8)
}

fn parse_tonality(s: &str) -> Result<Tonality, SamplerError> {
    Tonality::from_str(s).ok_or_else(|| SamplerError::invalid(format!("unknown tonality '{}'", s)))
}

fn parse_direction(s: &str) -> Result<Direction, SamplerError> {
    Direction::from_str(s).ok_or_else(|| SamplerError::invalid(format!("unknown direction '{}'", s)))
}

fn parse_beat_unit(s: &str) -> Result<BeatUnit, SamplerError> {
    BeatUnit::from_str(s).ok_or_else(|| SamplerError::invalid(format!("unknown beat unit '{}'", s)))
}

fn parse_time_signature(s: &str) -> Result<Option<TimeSignature>, SamplerError> {
    if s.trim().eq_ignore_ascii_case("auto") {
        Ok(None)
    } else {
        TimeSignature::parse(s).map(Some)
    }
}

fn parse_bool(key: &str, s: &str) -> Result<bool, SamplerError> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(SamplerError::invalid(format!("{} expects true or false, got '{}'", key, s))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, s: &str) -> Result<T, SamplerError> {
    s.parse()
        .map_err(|_| SamplerError::invalid(format!("{} expects a number, got '{}'", key, s)))
}
