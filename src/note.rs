//! # Note Model
//!
//! Absolute-pitch notes and their key-aware spellings.
//!
//! ## Type Hierarchy
//! ```text
//! Note          absolute chromatic index (0..NOTE_COUNT), equality by index
//!   └── TonalNote   Note + tonic + tonality, spelled through the key signature
//!         └── SampleNote   TonalNote + velocity, dot/dedot, articulation
//! ```
//!
//! ## Spelling
//! A `Note` only knows its natural (sharp) spelling. A `TonalNote` resolves
//! the key signature of its `(tonality, tonic degree)` pair on demand and may
//! spell the same pitch differently: index 60 is "C5" in C major but "B♯4" as
//! the leading tone of C♯ harmonic minor. Spelling never affects equality.
//!
//! ## Example
//! ```rust
//! use tonal_sampler::{Note, TonalNote, Tonality};
//!
//! let tonic = Note::new(49)?;             // C♯4
//! let c5 = Note::new(60)?;
//! let leading = TonalNote::new(c5, tonic, Tonality::HarmonicMinor);
//!
//! assert_eq!(c5.natural_spelling().to_string(), "C5");
//! assert_eq!(leading.spelling().to_string(), "B♯4");
//! assert_eq!(leading.note(), c5);
//! # Ok::<(), tonal_sampler::SamplerError>(())
//! ```

use crate::error::SamplerError;
use crate::key_signature::KeySignature;
use crate::tonality::Tonality;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Number of supported octaves, starting at octave 0.
pub const OCTAVES: usize = 9;

/// Size of the absolute note table.
pub const NOTE_COUNT: usize = OCTAVES * 12;

/// A4 sits at octave 4, degree 9.
const A4_INDEX: i32 = 57;
const A4_HZ: f64 = 440.0;

/// Letter for each degree; a repeated letter marks the raised (black-key) member.
const LETTERS: [Letter; 12] = [
    Letter::C,
    Letter::C,
    Letter::D,
    Letter::D,
    Letter::E,
    Letter::F,
    Letter::F,
    Letter::G,
    Letter::G,
    Letter::A,
    Letter::A,
    Letter::B,
];

const BLACK_KEYS: [bool; 12] = [
    false, true, false, true, false, false, true, false, true, false, true, false,
];

/// Equal-tempered frequencies for every supported index, built once.
fn frequency_table() -> &'static [f64; NOTE_COUNT] {
    static TABLE: OnceLock<[f64; NOTE_COUNT]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0.0; NOTE_COUNT];
        for (i, freq) in table.iter_mut().enumerate() {
            let interval = i as i32 - A4_INDEX;
            *freq = A4_HZ * 2f64.powf(interval as f64 / 12.0);
        }
        table
    })
}

/// Note letter name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    pub fn as_char(self) -> char {
        match self {
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
            Letter::F => 'F',
            Letter::G => 'G',
            Letter::A => 'A',
            Letter::B => 'B',
        }
    }
}

/// Accidental attached to a spelled note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

impl Accidental {
    pub fn symbol(self) -> &'static str {
        match self {
            Accidental::Natural => "",
            Accidental::Sharp => "♯",
            Accidental::Flat => "♭",
        }
    }
}

/// Display spelling of a pitch: letter, accidental and the octave it is
/// written in (which can differ from the absolute octave for B♯).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Spelling {
    pub letter: Letter,
    pub accidental: Accidental,
    pub octave: i8,
}

impl Spelling {
    /// Pitch-class name without the octave, e.g. "E♭".
    pub fn pitch_class(&self) -> String {
        format!("{}{}", self.letter.as_char(), self.accidental.symbol())
    }
}

impl fmt::Display for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.letter.as_char(), self.accidental.symbol(), self.octave)
    }
}

/// Name of a degree (0-11) without octave, preferring flats or sharps.
pub fn degree_name(degree: u8, prefer_flat: bool) -> String {
    let degree = (degree % 12) as usize;
    let (letter, accidental) = if !BLACK_KEYS[degree] {
        (LETTERS[degree], Accidental::Natural)
    } else if prefer_flat {
        (LETTERS[degree + 1], Accidental::Flat)
    } else {
        (LETTERS[degree], Accidental::Sharp)
    };
    format!("{}{}", letter.as_char(), accidental.symbol())
}

/// An absolute pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Note {
    index: u8,
}

impl Note {
    /// Create a note from its absolute index.
    ///
    /// # Errors
    /// `InvalidArgument` if the index is outside `0..NOTE_COUNT`.
    pub fn new(index: usize) -> Result<Self, SamplerError> {
        if index >= NOTE_COUNT {
            return Err(SamplerError::invalid(format!(
                "note index {} is outside 0-{}",
                index,
                NOTE_COUNT - 1
            )));
        }
        Ok(Self { index: index as u8 })
    }

    /// Create a note from an octave and a degree within it.
    pub fn from_parts(octave: u8, degree: u8) -> Result<Self, SamplerError> {
        if degree >= 12 {
            return Err(SamplerError::invalid(format!("degree {} is outside 0-11", degree)));
        }
        Self::new(octave as usize * 12 + degree as usize)
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn octave(self) -> u8 {
        self.index / 12
    }

    pub fn degree(self) -> u8 {
        self.index % 12
    }

    pub fn letter(self) -> Letter {
        LETTERS[self.degree() as usize]
    }

    pub fn is_black(self) -> bool {
        BLACK_KEYS[self.degree() as usize]
    }

    /// Frequency in Hz (A4 = 440).
    pub fn frequency(self) -> f64 {
        frequency_table()[self.index()]
    }

    /// Move by a number of half steps.
    pub fn transpose(self, semitones: i32) -> Result<Self, SamplerError> {
        let target = self.index as i32 + semitones;
        if target < 0 {
            return Err(SamplerError::invalid(format!(
                "transposing index {} by {} falls below the note table",
                self.index, semitones
            )));
        }
        Self::new(target as usize)
    }

    /// Spelling with sharps for black keys, independent of any key.
    pub fn natural_spelling(self) -> Spelling {
        Spelling {
            letter: self.letter(),
            accidental: if self.is_black() { Accidental::Sharp } else { Accidental::Natural },
            octave: self.octave() as i8,
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.natural_spelling())
    }
}

/// A note placed in a tonal context. Equality ignores the context.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TonalNote {
    note: Note,
    tonic: Note,
    tonality: Tonality,
}

impl TonalNote {
    pub fn new(note: Note, tonic: Note, tonality: Tonality) -> Self {
        Self { note, tonic, tonality }
    }

    pub fn note(&self) -> Note {
        self.note
    }

    pub fn tonic(&self) -> Note {
        self.tonic
    }

    pub fn tonality(&self) -> Tonality {
        self.tonality
    }

    pub fn index(&self) -> usize {
        self.note.index()
    }

    pub fn degree(&self) -> u8 {
        self.note.degree()
    }

    pub fn octave(&self) -> u8 {
        self.note.octave()
    }

    pub fn frequency(&self) -> f64 {
        self.note.frequency()
    }

    pub fn key_signature(&self) -> &'static KeySignature {
        KeySignature::lookup(self.tonality, self.tonic.degree())
    }

    /// Spelling relative to the tonic's key signature. Computed on every call.
    pub fn spelling(&self) -> Spelling {
        let signature = self.key_signature();
        let degree = self.note.degree();
        let octave = self.note.octave() as i8;
        let tonic_degree = self.tonic.degree();

        if !signature.is_flat {
            // E♯ belongs to F♯ major and to keys on F♯ with a raised 7th.
            if degree == 5 && (signature.major_degree == 6 || tonic_degree == 6) {
                return Spelling { letter: Letter::E, accidental: Accidental::Sharp, octave };
            }
            // B♯ is the leading tone of C♯; it is written in the octave below.
            if degree == 0 && tonic_degree == 1 {
                return Spelling { letter: Letter::B, accidental: Accidental::Sharp, octave: octave - 1 };
            }
        } else if self.note.is_black() {
            return Spelling {
                letter: LETTERS[degree as usize + 1],
                accidental: Accidental::Flat,
                octave,
            };
        }

        self.note.natural_spelling()
    }
}

impl PartialEq for TonalNote {
    fn eq(&self, other: &Self) -> bool {
        self.note == other.note
    }
}

impl Eq for TonalNote {}

impl fmt::Display for TonalNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}

/// Articulation tag for a performed note. `Open` marks a note that rings
/// through the hold after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Articulation {
    #[default]
    Unset,
    Open,
}

/// Velocity a note is performed at unless a transform says otherwise.
pub const DEFAULT_VELOCITY: f64 = 0.8;

/// A tonal note with mutable performance attributes.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleNote {
    pub tonal: TonalNote,
    pub velocity: f64,
    pub dot: bool,
    pub dedot: bool,
    pub articulation: Articulation,
}

impl SampleNote {
    pub fn new(tonal: TonalNote) -> Self {
        Self {
            tonal,
            velocity: DEFAULT_VELOCITY,
            dot: false,
            dedot: false,
            articulation: Articulation::Unset,
        }
    }

    pub fn note(&self) -> Note {
        self.tonal.note()
    }

    pub fn index(&self) -> usize {
        self.tonal.index()
    }

    pub fn frequency(&self) -> f64 {
        self.tonal.frequency()
    }

    pub fn spelling(&self) -> Spelling {
        self.tonal.spelling()
    }

    /// Neither dotted nor dedotted.
    pub fn is_plain(&self) -> bool {
        !self.dot && !self.dedot
    }

    /// Duration multiplier applied to the base note length.
    pub fn length_factor(&self) -> f64 {
        if self.dot {
            1.5
        } else if self.dedot {
            0.5
        } else {
            1.0
        }
    }
}

impl PartialEq for SampleNote {
    fn eq(&self, other: &Self) -> bool {
        self.tonal == other.tonal
    }
}

impl From<TonalNote> for SampleNote {
    fn from(tonal: TonalNote) -> Self {
        SampleNote::new(tonal)
    }
}
