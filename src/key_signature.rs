//! # Key Signature Resolver
//!
//! Maps a `(tonality, tonic degree)` pair to the major key whose signature it
//! borrows, and derives everything spelling needs from that: relative minor,
//! flat/sharp preference, accidental count and a display label.
//!
//! All 18 × 12 records are computed once on first use and shared read-only by
//! every note and scheduler afterwards.
//!
//! ## Example
//! ```rust
//! use tonal_sampler::{KeySignature, Tonality};
//!
//! let d_dorian = KeySignature::resolve(Tonality::Dorian, 2)?;
//! assert_eq!(d_dorian.major_degree, 0);      // borrows C major
//! assert_eq!(d_dorian.accidental_count, 0);
//! assert_eq!(d_dorian.label, "Am");
//! # Ok::<(), tonal_sampler::SamplerError>(())
//! ```

use crate::error::SamplerError;
use crate::note::degree_name;
use crate::tonality::Tonality;
use serde::Serialize;
use std::sync::OnceLock;

/// Major degrees whose keys are written with flats.
const FLAT_MAJOR_DEGREES: [u8; 5] = [1, 3, 5, 8, 10];

/// Minor tonics named with a flat even when their relative major is sharp.
const FLAT_MINOR_LABELS: [u8; 1] = [3];

/// Sharps or flats in each major key, indexed by its degree.
const ACCIDENTAL_COUNTS: [u8; 12] = [0, 5, 2, 3, 4, 1, 6, 1, 4, 3, 2, 5];

/// Derived accidental/spelling metadata for a tonality on a tonic degree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySignature {
    pub tonality: Tonality,
    pub tonic_degree: u8,
    /// False for scales without a conventional signature; those resolve as
    /// if the tonic were a major key.
    pub has_signature: bool,
    pub major_degree: u8,
    pub minor_degree: u8,
    pub is_minor: bool,
    pub is_flat: bool,
    pub accidental_count: u8,
    pub label: String,
}

impl KeySignature {
    fn compute(tonality: Tonality, tonic_degree: u8) -> Self {
        let offset = tonality.major_offset();
        let major_degree = (tonic_degree + offset.unwrap_or(0)) % 12;
        let minor_degree = (major_degree + 9) % 12;
        let is_minor = tonality.is_minor();
        let is_flat = FLAT_MAJOR_DEGREES.contains(&major_degree);

        let label = match offset {
            None => degree_name(tonic_degree, is_flat),
            Some(_) if is_minor => {
                let flat_label = is_flat || FLAT_MINOR_LABELS.contains(&minor_degree);
                format!("{}m", degree_name(minor_degree, flat_label))
            }
            Some(_) => degree_name(major_degree, is_flat),
        };

        Self {
            tonality,
            tonic_degree,
            has_signature: offset.is_some(),
            major_degree,
            minor_degree,
            is_minor,
            is_flat,
            accidental_count: ACCIDENTAL_COUNTS[major_degree as usize],
            label,
        }
    }

    fn table() -> &'static [KeySignature] {
        static TABLE: OnceLock<Vec<KeySignature>> = OnceLock::new();
        TABLE.get_or_init(|| {
            Tonality::ALL
                .iter()
                .flat_map(|&tonality| (0..12).map(move |degree| Self::compute(tonality, degree)))
                .collect()
        })
    }

    /// Cached record for a tonality and tonic degree. The degree wraps modulo 12.
    pub fn lookup(tonality: Tonality, tonic_degree: u8) -> &'static KeySignature {
        &Self::table()[tonality.code() * 12 + (tonic_degree % 12) as usize]
    }

    /// Cached record, rejecting degrees outside 0-11.
    pub fn resolve(tonality: Tonality, tonic_degree: u8) -> Result<&'static KeySignature, SamplerError> {
        if tonic_degree >= 12 {
            return Err(SamplerError::invalid(format!(
                "tonic degree {} is outside 0-11",
                tonic_degree
            )));
        }
        Ok(Self::lookup(tonality, tonic_degree))
    }

    /// Signed circle-of-fifths position: positive for sharps, negative for flats.
    pub fn fifths(&self) -> i8 {
        if self.is_flat {
            -(self.accidental_count as i8)
        } else {
            self.accidental_count as i8
        }
    }
}
