//! # Scale Generator
//!
//! Builds a [`TonalSample`] by walking a tonic through a tonality's interval
//! table for a number of octaves.
//!
//! ## Directions
//! - `Ascend` / `Descend` walk one way for `octave_span` octaves.
//! - `AscendDescend` / `DescendAscend` walk the first way, then walk back from
//!   the note reached using the opposite table. The turnaround note appears
//!   once.
//!
//! Generation is deterministic: the same arguments always produce the same
//! indices.
//!
//! ## Example
//! ```rust
//! use tonal_sampler::{generate, Direction, GenerateOptions, Tonality};
//!
//! let options = GenerateOptions {
//!     tonality: Tonality::Major,
//!     octave: 4,
//!     direction: Direction::AscendDescend,
//!     ..GenerateOptions::default()
//! };
//! let sample = generate(0, &options)?;
//! assert_eq!(sample.indices(), vec![48, 50, 52, 53, 55, 57, 59, 60, 59, 57, 55, 53, 52, 50, 48]);
//! # Ok::<(), tonal_sampler::SamplerError>(())
//! ```

use crate::error::SamplerError;
use crate::note::{Note, NOTE_COUNT, OCTAVES};
use crate::sample::TonalSample;
use crate::tonality::{Direction, Tonality};

/// Arguments to [`generate`] other than the tonic degree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerateOptions {
    pub tonality: Tonality,
    pub octave: u8,
    pub direction: Direction,
    pub octave_span: u8,
    pub use_arpeggio: bool,
    /// Clamp an over-long span to what fits instead of failing.
    pub clip_to_range: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            tonality: Tonality::Major,
            octave: 4,
            direction: Direction::Ascend,
            octave_span: 1,
            use_arpeggio: false,
            clip_to_range: false,
        }
    }
}

/// Generate a tonal sample starting on `tonic_degree` in `options.octave`.
///
/// # Errors
/// `InvalidArgument` if the degree is outside 0-11, the octave is outside the
/// note table, the span is zero, or the span does not fit and
/// `clip_to_range` is off (or not even one octave fits).
pub fn generate(tonic_degree: u8, options: &GenerateOptions) -> Result<TonalSample, SamplerError> {
    if tonic_degree >= 12 {
        return Err(SamplerError::invalid(format!(
            "tonic degree {} is outside 0-11",
            tonic_degree
        )));
    }
    if options.octave as usize >= OCTAVES {
        return Err(SamplerError::invalid(format!(
            "octave {} is outside 0-{}",
            options.octave,
            OCTAVES - 1
        )));
    }
    if options.octave_span == 0 {
        return Err(SamplerError::invalid("octave span must be at least 1"));
    }

    let tonic = Note::from_parts(options.octave, tonic_degree)?;
    let span = fit_span(tonic, options)?;
    let table = options.tonality.steps(options.use_arpeggio);
    let upward = options.direction.starts_upward();

    let mut notes = walk(tonic, &table.for_direction(options.direction), span, upward)?;

    if options.direction.is_composite() {
        let turnaround = *notes.last().unwrap_or(&tonic);
        let back_steps = if upward { table.descending() } else { table.ascending().to_vec() };
        let back = walk(turnaround, &back_steps, span, !upward)?;
        notes.extend(back.into_iter().skip(1));
    }

    log::debug!(
        "generated {} {} notes from {} over {} octave(s)",
        notes.len(),
        options.tonality,
        tonic,
        span
    );

    Ok(TonalSample::new(tonic, options.tonality, notes))
}

/// Largest span that still fits the note table in the first leg's direction.
fn available_span(tonic: Note, direction: Direction) -> u8 {
    let room = if direction.starts_upward() {
        NOTE_COUNT - 1 - tonic.index()
    } else {
        tonic.index()
    };
    (room / 12) as u8
}

fn fit_span(tonic: Note, options: &GenerateOptions) -> Result<u8, SamplerError> {
    let available = available_span(tonic, options.direction);
    if options.octave_span <= available {
        return Ok(options.octave_span);
    }
    if options.clip_to_range && available >= 1 {
        log::debug!(
            "clipping octave span {} to {} from {}",
            options.octave_span,
            available,
            tonic
        );
        return Ok(available);
    }
    Err(SamplerError::invalid(format!(
        "octave span {} from {} exceeds the available range ({} octave(s))",
        options.octave_span, tonic, available
    )))
}

/// Walk `steps` repeatedly for `span` octaves, including the start note.
fn walk(start: Note, steps: &[u8], span: u8, upward: bool) -> Result<Vec<Note>, SamplerError> {
    let mut notes = Vec::with_capacity(steps.len() * span as usize + 1);
    let mut current = start;
    notes.push(current);
    for _ in 0..span {
        for &step in steps {
            let step = step as i32;
            current = current.transpose(if upward { step } else { -step })?;
            notes.push(current);
        }
    }
    Ok(notes)
}
