//! # Tonalities and Interval Tables
//!
//! Every tonality carries two interval tables: one for scale steps and one for
//! arpeggio steps. Each table lists the half steps between successive notes
//! across one octave, ascending. The descending sequence is the ascending one
//! reversed unless the table overrides it (melodic minor falls back to the
//! natural minor on the way down).
//!
//! ## Example
//! ```rust
//! use tonal_sampler::{Tonality, Direction};
//!
//! let steps = Tonality::Major.scale_steps();
//! assert_eq!(steps.ascending(), &[2, 2, 1, 2, 2, 2, 1]);
//! assert_eq!(steps.for_direction(Direction::Descend), vec![1, 2, 2, 2, 1, 2, 2]);
//! ```

use crate::error::SamplerError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale or mode code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tonality {
    Major,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Minor,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
    Diminished,
    WholeTone,
    Augmented,
    Prometheus,
    Tritone,
    MajorPentatonic,
    MinorPentatonic,
    EgyptianPentatonic,
    Blues,
}

/// Direction a sample is walked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    Ascend,
    Descend,
    AscendDescend,
    DescendAscend,
}

/// Half-step sequence for one octave in each direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTable {
    ascending: &'static [u8],
    descending: Option<&'static [u8]>,
}

impl StepTable {
    const fn new(ascending: &'static [u8]) -> Self {
        Self { ascending, descending: None }
    }

    const fn with_descending(ascending: &'static [u8], descending: &'static [u8]) -> Self {
        Self { ascending, descending: Some(descending) }
    }

    pub fn ascending(&self) -> &'static [u8] {
        self.ascending
    }

    /// Half steps walking down from the top, first step first.
    pub fn descending(&self) -> Vec<u8> {
        match self.descending {
            Some(steps) => steps.to_vec(),
            None => self.ascending.iter().rev().copied().collect(),
        }
    }

    /// Steps for a single-direction walk. Composite directions start with
    /// their first leg.
    pub fn for_direction(&self, direction: Direction) -> Vec<u8> {
        match direction {
            Direction::Ascend | Direction::AscendDescend => self.ascending.to_vec(),
            Direction::Descend | Direction::DescendAscend => self.descending(),
        }
    }

    /// Number of notes per octave.
    pub fn len(&self) -> usize {
        self.ascending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ascending.is_empty()
    }
}

impl Tonality {
    pub const ALL: [Tonality; 18] = [
        Tonality::Major,
        Tonality::Dorian,
        Tonality::Phrygian,
        Tonality::Lydian,
        Tonality::Mixolydian,
        Tonality::Minor,
        Tonality::Locrian,
        Tonality::HarmonicMinor,
        Tonality::MelodicMinor,
        Tonality::Diminished,
        Tonality::WholeTone,
        Tonality::Augmented,
        Tonality::Prometheus,
        Tonality::Tritone,
        Tonality::MajorPentatonic,
        Tonality::MinorPentatonic,
        Tonality::EgyptianPentatonic,
        Tonality::Blues,
    ];

    /// Position in [`Tonality::ALL`], used to index precomputed tables.
    pub fn code(self) -> usize {
        self as usize
    }

    pub fn from_code(code: usize) -> Result<Self, SamplerError> {
        Self::ALL
            .get(code)
            .copied()
            .ok_or_else(|| SamplerError::invalid(format!("unknown tonality code {}", code)))
    }

    /// Parse a tonality name such as "major", "harmonic-minor" or "aeolian".
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-").replace(' ', "-");
        let tonality = match normalized.as_str() {
            "major" | "ionian" => Tonality::Major,
            "dorian" => Tonality::Dorian,
            "phrygian" => Tonality::Phrygian,
            "lydian" => Tonality::Lydian,
            "mixolydian" => Tonality::Mixolydian,
            "minor" | "aeolian" | "natural-minor" => Tonality::Minor,
            "locrian" => Tonality::Locrian,
            "harmonic-minor" => Tonality::HarmonicMinor,
            "melodic-minor" => Tonality::MelodicMinor,
            "diminished" | "octatonic" => Tonality::Diminished,
            "whole-tone" => Tonality::WholeTone,
            "augmented" => Tonality::Augmented,
            "prometheus" => Tonality::Prometheus,
            "tritone" => Tonality::Tritone,
            "major-pentatonic" => Tonality::MajorPentatonic,
            "minor-pentatonic" => Tonality::MinorPentatonic,
            "egyptian-pentatonic" | "suspended-pentatonic" => Tonality::EgyptianPentatonic,
            "blues" => Tonality::Blues,
            _ => return None,
        };
        Some(tonality)
    }

    pub fn name(self) -> &'static str {
        match self {
            Tonality::Major => "major",
            Tonality::Dorian => "dorian",
            Tonality::Phrygian => "phrygian",
            Tonality::Lydian => "lydian",
            Tonality::Mixolydian => "mixolydian",
            Tonality::Minor => "minor",
            Tonality::Locrian => "locrian",
            Tonality::HarmonicMinor => "harmonic-minor",
            Tonality::MelodicMinor => "melodic-minor",
            Tonality::Diminished => "diminished",
            Tonality::WholeTone => "whole-tone",
            Tonality::Augmented => "augmented",
            Tonality::Prometheus => "prometheus",
            Tonality::Tritone => "tritone",
            Tonality::MajorPentatonic => "major-pentatonic",
            Tonality::MinorPentatonic => "minor-pentatonic",
            Tonality::EgyptianPentatonic => "egyptian-pentatonic",
            Tonality::Blues => "blues",
        }
    }

    /// Semitones from the tonic up to the major key sharing this mode's
    /// signature. `None` for scales without a conventional key signature.
    pub fn major_offset(self) -> Option<u8> {
        match self {
            Tonality::Major | Tonality::MajorPentatonic => Some(0),
            Tonality::Dorian | Tonality::EgyptianPentatonic => Some(10),
            Tonality::Phrygian => Some(8),
            Tonality::Lydian => Some(7),
            Tonality::Mixolydian => Some(5),
            Tonality::Minor
            | Tonality::HarmonicMinor
            | Tonality::MelodicMinor
            | Tonality::MinorPentatonic
            | Tonality::Blues => Some(3),
            Tonality::Locrian => Some(1),
            Tonality::Diminished
            | Tonality::WholeTone
            | Tonality::Augmented
            | Tonality::Prometheus
            | Tonality::Tritone => None,
        }
    }

    pub fn is_minor(self) -> bool {
        matches!(
            self,
            Tonality::Dorian
                | Tonality::Phrygian
                | Tonality::Minor
                | Tonality::Locrian
                | Tonality::HarmonicMinor
                | Tonality::MelodicMinor
                | Tonality::MinorPentatonic
                | Tonality::Blues
        )
    }

    pub fn scale_steps(self) -> StepTable {
        match self {
            Tonality::Major => StepTable::new(&[2, 2, 1, 2, 2, 2, 1]),
            Tonality::Dorian => StepTable::new(&[2, 1, 2, 2, 2, 1, 2]),
            Tonality::Phrygian => StepTable::new(&[1, 2, 2, 2, 1, 2, 2]),
            Tonality::Lydian => StepTable::new(&[2, 2, 2, 1, 2, 2, 1]),
            Tonality::Mixolydian => StepTable::new(&[2, 2, 1, 2, 2, 1, 2]),
            Tonality::Minor => StepTable::new(&[2, 1, 2, 2, 1, 2, 2]),
            Tonality::Locrian => StepTable::new(&[1, 2, 2, 1, 2, 2, 2]),
            Tonality::HarmonicMinor => StepTable::new(&[2, 1, 2, 2, 1, 3, 1]),
            // Raised 6th and 7th going up, natural minor coming down.
            Tonality::MelodicMinor => {
                StepTable::with_descending(&[2, 1, 2, 2, 2, 2, 1], &[2, 2, 1, 2, 2, 1, 2])
            }
            Tonality::Diminished => StepTable::new(&[2, 1, 2, 1, 2, 1, 2, 1]),
            Tonality::WholeTone => StepTable::new(&[2, 2, 2, 2, 2, 2]),
            Tonality::Augmented => StepTable::new(&[3, 1, 3, 1, 3, 1]),
            Tonality::Prometheus => StepTable::new(&[2, 2, 2, 3, 1, 2]),
            Tonality::Tritone => StepTable::new(&[1, 3, 2, 1, 3, 2]),
            Tonality::MajorPentatonic => StepTable::new(&[2, 2, 3, 2, 3]),
            Tonality::MinorPentatonic => StepTable::new(&[3, 2, 2, 3, 2]),
            Tonality::EgyptianPentatonic => StepTable::new(&[2, 3, 2, 3, 2]),
            Tonality::Blues => StepTable::new(&[3, 2, 1, 1, 3, 2]),
        }
    }

    /// Arpeggio tables. The melodic minor and the symmetric/exotic entries
    /// are provisional voicings, kept as data so they can be revised.
    pub fn arpeggio_steps(self) -> StepTable {
        match self {
            Tonality::Major
            | Tonality::Lydian
            | Tonality::Mixolydian
            | Tonality::MajorPentatonic => StepTable::new(&[4, 3, 5]),
            Tonality::Dorian
            | Tonality::Phrygian
            | Tonality::Minor
            | Tonality::HarmonicMinor
            | Tonality::MinorPentatonic => StepTable::new(&[3, 4, 5]),
            Tonality::MelodicMinor => StepTable::new(&[3, 4, 5]),
            Tonality::Locrian => StepTable::new(&[3, 3, 6]),
            Tonality::Diminished => StepTable::new(&[3, 3, 3, 3]),
            Tonality::WholeTone | Tonality::Augmented => StepTable::new(&[4, 4, 4]),
            Tonality::Prometheus => StepTable::new(&[4, 5, 3]),
            Tonality::Tritone => StepTable::new(&[4, 2, 4, 2]),
            Tonality::EgyptianPentatonic => StepTable::new(&[5, 2, 5]),
            Tonality::Blues => StepTable::new(&[3, 3, 4, 2]),
        }
    }

    pub fn steps(self, use_arpeggio: bool) -> StepTable {
        if use_arpeggio {
            self.arpeggio_steps()
        } else {
            self.scale_steps()
        }
    }
}

impl fmt::Display for Tonality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ascend" | "up" => Some(Direction::Ascend),
            "descend" | "down" => Some(Direction::Descend),
            "ascend-descend" | "up-down" => Some(Direction::AscendDescend),
            "descend-ascend" | "down-up" => Some(Direction::DescendAscend),
            _ => None,
        }
    }

    /// Whether the first leg of the walk goes up.
    pub fn starts_upward(self) -> bool {
        matches!(self, Direction::Ascend | Direction::AscendDescend)
    }

    pub fn is_composite(self) -> bool {
        matches!(self, Direction::AscendDescend | Direction::DescendAscend)
    }
}
