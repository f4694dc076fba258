//! # Samples
//!
//! Two layers of note sequence:
//!
//! ```text
//! TonalSample   generated notes + tonic + tonality (no rhythm)
//!   └── Sample  playback-ready entries with rhythm, velocity and metre
//!         ├── Vec<Entry> (Note | Rest | Hold)
//!         ├── beat unit, note duration, time signature, notes per measure
//!         ├── counter (monotonic across rebuilds)
//!         └── prev (the sample this one replaced, one generation deep)
//! ```
//!
//! A `Sample` is rebuilt from its `TonalSample` every time the scheduler
//! decides a rebuild is due. The transform pipeline mutates the fresh copy
//! before it is queued; once queued it is only read.

use crate::error::SamplerError;
use crate::note::{Note, SampleNote, TonalNote};
use crate::tonality::Tonality;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rhythmic unit every plain note is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BeatUnit {
    #[serde(rename = "1/16")]
    Sixteenth,
    #[serde(rename = "1/8")]
    Eighth,
    #[default]
    #[serde(rename = "1/4")]
    Quarter,
    #[serde(rename = "1/2")]
    Half,
}

impl BeatUnit {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim() {
            "1/16" | "16" | "sixteenth" => Some(BeatUnit::Sixteenth),
            "1/8" | "8" | "eighth" => Some(BeatUnit::Eighth),
            "1/4" | "4" | "quarter" => Some(BeatUnit::Quarter),
            "1/2" | "2" | "half" => Some(BeatUnit::Half),
            _ => None,
        }
    }

    /// Note-value denominator (16, 8, 4 or 2).
    pub fn denominator(self) -> u8 {
        match self {
            BeatUnit::Sixteenth => 16,
            BeatUnit::Eighth => 8,
            BeatUnit::Quarter => 4,
            BeatUnit::Half => 2,
        }
    }

    /// Length in quarter-note beats.
    pub fn as_beats(self) -> f64 {
        4.0 / self.denominator() as f64
    }

    /// Length in seconds at a quarter-note tempo.
    pub fn seconds_at(self, bpm: f64) -> f64 {
        self.as_beats() * 60.0 / bpm
    }
}

impl fmt::Display for BeatUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "1/{}", self.denominator())
    }
}

/// Time signature (e.g., 4/4, 3/8). `invalid` marks a signature that does
/// not evenly organize the sample it was inferred for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSignature {
    pub upper: u8,
    pub lower: u8,
    pub invalid: bool,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self { upper: 4, lower: 4, invalid: false }
    }
}

impl TimeSignature {
    /// Explicit signature, validated.
    pub fn new(upper: u8, lower: u8) -> Result<Self, SamplerError> {
        if !(1..=32).contains(&upper) {
            return Err(SamplerError::invalid(format!(
                "time signature numerator {} is outside 1-32",
                upper
            )));
        }
        if ![1, 2, 4, 8, 16, 32].contains(&lower) {
            return Err(SamplerError::invalid(format!(
                "time signature denominator {} is not a power of two up to 32",
                lower
            )));
        }
        Ok(Self { upper, lower, invalid: false })
    }

    /// Parse "N/D".
    pub fn parse(s: &str) -> Result<Self, SamplerError> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.len() != 2 {
            return Err(SamplerError::invalid(format!("Invalid time signature: {}", s)));
        }
        let upper = parts[0]
            .trim()
            .parse()
            .map_err(|_| SamplerError::invalid(format!("Invalid time signature numerator: {}", s)))?;
        let lower = parts[1]
            .trim()
            .parse()
            .map_err(|_| SamplerError::invalid(format!("Invalid time signature denominator: {}", s)))?;
        Self::new(upper, lower)
    }

    /// Pick a signature for `len` entries of `unit`: the first of 4, 3, 2
    /// beats per bar that divides the length, else 4 flagged invalid.
    pub fn infer(len: usize, unit: BeatUnit) -> Self {
        let lower = unit.denominator();
        match [4u8, 3, 2].into_iter().find(|&upper| len > 0 && len % upper as usize == 0) {
            Some(upper) => Self { upper, lower, invalid: false },
            None => Self { upper: 4, lower, invalid: true },
        }
    }

    /// How many `unit` notes fill one measure, and whether that count is exact.
    pub fn notes_per_measure(&self, unit: BeatUnit) -> (usize, bool) {
        let numerator = self.upper as usize * unit.denominator() as usize;
        let lower = self.lower as usize;
        let count = (numerator / lower).max(1);
        (count, numerator % lower == 0 && numerator >= lower)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.upper, self.lower)
    }
}

/// A generated, rhythm-free note sequence.
///
/// Every slot is a pitched note with the tonic first. Rests and holds only
/// appear once a [`Sample`] is built and transformed; see [`Entry`].
#[derive(Debug, Clone, PartialEq)]
pub struct TonalSample {
    notes: Vec<TonalNote>,
    tonic: Note,
    tonality: Tonality,
}

impl TonalSample {
    pub fn new(tonic: Note, tonality: Tonality, notes: Vec<Note>) -> Self {
        let notes = notes
            .into_iter()
            .map(|note| TonalNote::new(note, tonic, tonality))
            .collect();
        Self { notes, tonic, tonality }
    }

    pub fn notes(&self) -> &[TonalNote] {
        &self.notes
    }

    pub fn tonic(&self) -> Note {
        self.tonic
    }

    pub fn tonality(&self) -> Tonality {
        self.tonality
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Absolute indices, for structural comparisons.
    pub fn indices(&self) -> Vec<usize> {
        self.notes.iter().map(|n| n.index()).collect()
    }
}

/// One position in a playback sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Entry {
    Note(SampleNote),
    /// Silence for one note length.
    Rest,
    /// Sustain whatever sounded before for one note length.
    Hold,
}

impl Entry {
    pub fn as_note(&self) -> Option<&SampleNote> {
        match self {
            Entry::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn as_note_mut(&mut self) -> Option<&mut SampleNote> {
        match self {
            Entry::Note(note) => Some(note),
            _ => None,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self, Entry::Note(_))
    }

    /// Multiplier on the base note length.
    pub fn length_factor(&self) -> f64 {
        match self {
            Entry::Note(note) => note.length_factor(),
            Entry::Rest | Entry::Hold => 1.0,
        }
    }
}

/// Playback-ready sample.
#[derive(Debug, Clone)]
pub struct Sample {
    entries: Vec<Entry>,
    tonic: Note,
    tonality: Tonality,
    beat_unit: BeatUnit,
    time_signature: TimeSignature,
    notes_per_measure: usize,
    counter: u64,
    prev: Option<Box<Sample>>,
}

impl Sample {
    /// Build a fresh sample from generated notes.
    ///
    /// `explicit_signature` overrides inference. `prev` is the sample being
    /// replaced; its own `prev` is dropped so only one generation is kept.
    pub fn build(
        tonal: &TonalSample,
        beat_unit: BeatUnit,
        explicit_signature: Option<TimeSignature>,
        prev: Option<Sample>,
    ) -> Self {
        let entries: Vec<Entry> = tonal
            .notes()
            .iter()
            .map(|&tonal_note| Entry::Note(SampleNote::new(tonal_note)))
            .collect();

        let mut time_signature =
            explicit_signature.unwrap_or_else(|| TimeSignature::infer(entries.len(), beat_unit));
        let (notes_per_measure, exact) = time_signature.notes_per_measure(beat_unit);
        if !exact {
            time_signature.invalid = true;
        }

        let prev = prev.map(|mut previous| {
            previous.prev = None;
            Box::new(previous)
        });
        let counter = prev.as_ref().map_or(0, |p| p.counter + 1);

        Self {
            entries,
            tonic: tonal.tonic(),
            tonality: tonal.tonality(),
            beat_unit,
            time_signature,
            notes_per_measure,
            counter,
            prev,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pitched entries.
    pub fn note_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_note()).count()
    }

    pub fn tonic(&self) -> Note {
        self.tonic
    }

    pub fn tonality(&self) -> Tonality {
        self.tonality
    }

    pub fn beat_unit(&self) -> BeatUnit {
        self.beat_unit
    }

    /// Base note length in quarter-note beats.
    pub fn note_duration(&self) -> f64 {
        self.beat_unit.as_beats()
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    pub fn notes_per_measure(&self) -> usize {
        self.notes_per_measure
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }

    pub fn prev(&self) -> Option<&Sample> {
        self.prev.as_deref()
    }

    /// Last pitched note, if any.
    pub fn last_note(&self) -> Option<&SampleNote> {
        self.entries.iter().rev().find_map(Entry::as_note)
    }

    /// Position within its measure (0-based).
    pub fn measure_position(&self, index: usize) -> usize {
        index % self.notes_per_measure
    }

    /// Total length in quarter-note beats, honouring dots and dedots.
    pub fn total_beats(&self) -> f64 {
        let base = self.note_duration();
        self.entries.iter().map(|e| base * e.length_factor()).sum()
    }

    /// Total length in seconds at a quarter-note tempo.
    pub fn duration_seconds(&self, bpm: f64) -> f64 {
        self.total_beats() * 60.0 / bpm
    }
}
