//! Probabilistic reordering with weighted substitutions.
//!
//! A shuffler carries three weighted tables:
//! - `fill` may overwrite one random position before reordering
//! - `start` may force the first position after reordering
//! - `end` may force the last position after reordering
//!
//! Table keys select a value out of the pre-shuffle sequence:
//!
//! | Key | Resolves to |
//! |---|---|
//! | `3`, `-1` | entry at that index, negative counts from the end, wraps |
//! | `/N` | entry at round(len / N) |
//! | `//N` | entry at floor(len / N) |
//! | `/cN` | entry at ceil(len / N) |
//! | `random` | a uniformly chosen pitched entry |
//! | `null` | a rest |
//! | `hold` | a hold (sustain previous) |
//!
//! Entries are tried in ascending probability; one uniform draw picks the
//! first entry whose probability is at least the draw. If none qualifies the
//! lookup yields [`Substitution::NoValue`].
//!
//! A note directly followed by a hold is tagged [`Articulation::Open`]: it
//! rings on through the hold.

use super::{ShufflerKind, Stage, MIN_TRANSFORM_LEN};
use crate::error::SamplerError;
use crate::note::{Articulation, SampleNote};
use crate::sample::{Entry, Sample};
use rand::{Rng, RngCore};

/// Key of a weighted table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey {
    Index(i64),
    Round(u32),
    Floor(u32),
    Ceil(u32),
    Random,
    Null,
    Hold,
}

impl TableKey {
    pub fn parse(s: &str) -> Result<Self, SamplerError> {
        let s = s.trim();
        let divisor = |digits: &str| -> Result<u32, SamplerError> {
            match digits.parse::<u32>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(SamplerError::invalid(format!("invalid table key '{}'", s))),
            }
        };

        if let Some(rest) = s.strip_prefix("//") {
            return Ok(TableKey::Floor(divisor(rest)?));
        }
        if let Some(rest) = s.strip_prefix("/c") {
            return Ok(TableKey::Ceil(divisor(rest)?));
        }
        if let Some(rest) = s.strip_prefix('/') {
            return Ok(TableKey::Round(divisor(rest)?));
        }
        match s {
            "random" => Ok(TableKey::Random),
            "null" => Ok(TableKey::Null),
            "hold" => Ok(TableKey::Hold),
            _ => s
                .parse::<i64>()
                .map(TableKey::Index)
                .map_err(|_| SamplerError::invalid(format!("invalid table key '{}'", s))),
        }
    }

    /// Index this key points at in a sequence of `len`, for positional keys.
    pub fn resolve_index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let n = len as f64;
        let index = match *self {
            TableKey::Index(i) => i.rem_euclid(len as i64) as usize,
            TableKey::Round(d) => (n / d as f64).round() as usize,
            TableKey::Floor(d) => (n / d as f64).floor() as usize,
            TableKey::Ceil(d) => (n / d as f64).ceil() as usize,
            TableKey::Random | TableKey::Null | TableKey::Hold => return None,
        };
        Some(index.min(len - 1))
    }
}

/// Outcome of a weighted lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Substitution {
    NoValue,
    Rest,
    Hold,
    Value(SampleNote),
}

impl Substitution {
    fn from_entry(entry: &Entry) -> Self {
        match entry {
            Entry::Note(note) => Substitution::Value(*note),
            Entry::Rest => Substitution::Rest,
            Entry::Hold => Substitution::Hold,
        }
    }

    fn into_entry(self) -> Option<Entry> {
        match self {
            Substitution::NoValue => None,
            Substitution::Rest => Some(Entry::Rest),
            Substitution::Hold => Some(Entry::Hold),
            Substitution::Value(note) => Some(Entry::Note(note)),
        }
    }
}

/// Key → probability table, kept sorted by ascending probability.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedTable {
    entries: Vec<(TableKey, f64)>,
}

impl WeightedTable {
    pub fn new(mut entries: Vec<(TableKey, f64)>) -> Result<Self, SamplerError> {
        if let Some((key, p)) = entries.iter().find(|(_, p)| !(0.0..=1.0).contains(p)) {
            return Err(SamplerError::invalid(format!(
                "probability {} for {:?} is outside 0-1",
                p, key
            )));
        }
        entries.sort_by(|a, b| a.1.total_cmp(&b.1));
        Ok(Self { entries })
    }

    /// Parse textual keys such as `("/2", 0.3)` or `("random", 0.1)`.
    pub fn parse(entries: &[(&str, f64)]) -> Result<Self, SamplerError> {
        let parsed = entries
            .iter()
            .map(|&(key, p)| TableKey::parse(key).map(|k| (k, p)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    fn certain(key: TableKey) -> Self {
        Self { entries: vec![(key, 1.0)] }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(TableKey, f64)] {
        &self.entries
    }

    /// First key whose probability is at least `draw`.
    pub fn select(&self, draw: f64) -> Option<TableKey> {
        self.entries.iter().find(|(_, p)| *p >= draw).map(|(key, _)| *key)
    }

    /// Draw once and resolve the selected key against `entries`.
    pub fn lookup(&self, entries: &[Entry], rng: &mut dyn RngCore) -> Substitution {
        if self.is_empty() || entries.is_empty() {
            return Substitution::NoValue;
        }
        let draw: f64 = rng.gen();
        let Some(key) = self.select(draw) else {
            return Substitution::NoValue;
        };
        match key {
            TableKey::Null => Substitution::Rest,
            TableKey::Hold => Substitution::Hold,
            TableKey::Random => {
                let notes: Vec<&SampleNote> = entries.iter().filter_map(Entry::as_note).collect();
                if notes.is_empty() {
                    Substitution::NoValue
                } else {
                    Substitution::Value(*notes[rng.gen_range(0..notes.len())])
                }
            }
            positional => match positional.resolve_index(entries.len()) {
                Some(index) => Substitution::from_entry(&entries[index]),
                None => Substitution::NoValue,
            },
        }
    }
}

/// Range the base shuffle may touch, plus an optional cap on swaps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ShuffleBounds {
    pub from: Option<TableKey>,
    pub to: Option<TableKey>,
    pub limit: Option<usize>,
}

impl ShuffleBounds {
    /// Half-open range of indices for a sequence of `len`.
    pub fn range(&self, len: usize) -> (usize, usize) {
        let lo = self.from.and_then(|k| k.resolve_index(len)).unwrap_or(0);
        let hi = self.to.and_then(|k| k.resolve_index(len)).map_or(len, |i| i + 1);
        (lo.min(len), hi.max(lo).min(len))
    }
}

/// Fisher–Yates over `items[lo..hi]`, stopping after `limit` swaps.
pub fn fisher_yates<T>(items: &mut [T], bounds: &ShuffleBounds, rng: &mut dyn RngCore) {
    let (lo, hi) = bounds.range(items.len());
    if hi.saturating_sub(lo) < 2 {
        return;
    }
    let limit = bounds.limit.unwrap_or(usize::MAX);
    for i in (lo + 1..hi).rev().take(limit) {
        let j = rng.gen_range(lo..=i);
        items.swap(i, j);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shuffler {
    pub fill: WeightedTable,
    pub start: WeightedTable,
    pub end: WeightedTable,
    pub bounds: ShuffleBounds,
    /// Run the base shuffle at all.
    pub reorder: bool,
    /// Swap the opening entry away when it repeats the previous sample's last pitch.
    pub avoid_seam_repeat: bool,
}

impl Default for Shuffler {
    fn default() -> Self {
        Self {
            fill: WeightedTable::default(),
            start: WeightedTable::default(),
            end: WeightedTable::default(),
            bounds: ShuffleBounds::default(),
            reorder: true,
            avoid_seam_repeat: false,
        }
    }
}

impl Shuffler {
    pub fn preset(kind: ShufflerKind) -> Self {
        let keep_tonic = WeightedTable::certain(TableKey::Index(0));
        match kind {
            ShufflerKind::None => Self { reorder: false, ..Self::default() },
            ShufflerKind::Full => Self::default(),
            ShufflerKind::KeepTonic => Self { start: keep_tonic, ..Self::default() },
            ShufflerKind::Bookends => Self {
                start: keep_tonic,
                end: WeightedTable::certain(TableKey::Index(-1)),
                ..Self::default()
            },
            ShufflerKind::Sprinkle => Self {
                fill: WeightedTable { entries: vec![(TableKey::Random, 0.2), (TableKey::Null, 0.35)] },
                start: keep_tonic,
                avoid_seam_repeat: true,
                ..Self::default()
            },
            ShufflerKind::TailSwap => Self {
                end: WeightedTable { entries: vec![(TableKey::Ceil(2), 0.5)] },
                bounds: ShuffleBounds { from: Some(TableKey::Round(2)), to: None, limit: None },
                ..Self::default()
            },
        }
    }
}

impl Stage for Shuffler {
    fn name(&self) -> &'static str {
        "shuffler"
    }

    fn apply(&self, sample: &mut Sample, rng: &mut dyn RngCore) {
        let len = sample.len();
        if len < MIN_TRANSFORM_LEN {
            return;
        }
        let seam = if self.avoid_seam_repeat {
            sample.prev().and_then(|p| p.last_note()).map(|n| n.index())
        } else {
            None
        };

        let entries = sample.entries_mut();
        let fill = self.fill.lookup(entries, rng);
        let start = self.start.lookup(entries, rng);
        let end = self.end.lookup(entries, rng);

        if let Some(entry) = fill.into_entry() {
            let position = rng.gen_range(0..len);
            entries[position] = entry;
        }

        if self.reorder {
            fisher_yates(entries, &self.bounds, rng);
        }

        if let Some(seam_index) = seam {
            if entries[0].as_note().map(|n| n.index()) == Some(seam_index) {
                let other = rng.gen_range(1..len);
                entries.swap(0, other);
            }
        }

        if let Some(entry) = start.into_entry() {
            entries[0] = entry;
        }
        if let Some(entry) = end.into_entry() {
            entries[len - 1] = entry;
        }

        for i in 0..len - 1 {
            let rings = matches!(entries[i + 1], Entry::Hold);
            if let Entry::Note(note) = &mut entries[i] {
                note.articulation = if rings { Articulation::Open } else { Articulation::Unset };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::BeatUnit;
    use crate::scale::{generate, GenerateOptions};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn c_major() -> Sample {
        let tonal = generate(0, &GenerateOptions::default()).unwrap();
        Sample::build(&tonal, BeatUnit::Quarter, None, None)
    }

    fn sorted_indices(sample: &Sample) -> Vec<usize> {
        let mut indices: Vec<usize> = sample.entries().iter().filter_map(Entry::as_note).map(|n| n.index()).collect();
        indices.sort();
        indices
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(TableKey::parse("3").unwrap(), TableKey::Index(3));
        assert_eq!(TableKey::parse("-1").unwrap(), TableKey::Index(-1));
        assert_eq!(TableKey::parse("/2").unwrap(), TableKey::Round(2));
        assert_eq!(TableKey::parse("//3").unwrap(), TableKey::Floor(3));
        assert_eq!(TableKey::parse("/c3").unwrap(), TableKey::Ceil(3));
        assert_eq!(TableKey::parse("random").unwrap(), TableKey::Random);
        assert_eq!(TableKey::parse("null").unwrap(), TableKey::Null);
        assert!(TableKey::parse("/0").is_err());
        assert!(TableKey::parse("middle").is_err());
    }

    #[test]
    fn test_key_resolution() {
        assert_eq!(TableKey::Index(-1).resolve_index(8), Some(7));
        assert_eq!(TableKey::Index(10).resolve_index(8), Some(2));
        assert_eq!(TableKey::Round(3).resolve_index(8), Some(3)); // 2.67
        assert_eq!(TableKey::Floor(3).resolve_index(8), Some(2));
        assert_eq!(TableKey::Ceil(3).resolve_index(8), Some(3));
        assert_eq!(TableKey::Round(1).resolve_index(8), Some(7)); // clamped
        assert_eq!(TableKey::Random.resolve_index(8), None);
    }

    #[test]
    fn test_select_in_ascending_probability() {
        let table = WeightedTable::parse(&[("null", 0.6), ("0", 0.2)]).unwrap();
        assert_eq!(table.entries()[0].0, TableKey::Index(0));
        assert_eq!(table.select(0.1), Some(TableKey::Index(0)));
        assert_eq!(table.select(0.2), Some(TableKey::Index(0)));
        assert_eq!(table.select(0.5), Some(TableKey::Null));
        assert_eq!(table.select(0.9), None);
        assert!(WeightedTable::parse(&[("0", 1.5)]).is_err());
    }

    #[test]
    fn test_lookup_sentinels() {
        let sample = c_major();
        let mut rng = Pcg32::seed_from_u64(5);
        assert_eq!(WeightedTable::default().lookup(sample.entries(), &mut rng), Substitution::NoValue);
        let never = WeightedTable::parse(&[("0", 0.0)]).unwrap();
        assert_eq!(never.lookup(sample.entries(), &mut rng), Substitution::NoValue);
        let rest = WeightedTable::parse(&[("null", 1.0)]).unwrap();
        assert_eq!(rest.lookup(sample.entries(), &mut rng), Substitution::Rest);
        let last = WeightedTable::parse(&[("-1", 1.0)]).unwrap();
        match last.lookup(sample.entries(), &mut rng) {
            Substitution::Value(note) => assert_eq!(note.index(), 60),
            other => panic!("expected a note, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_tables_preserve_multiset() {
        let mut sample = c_major();
        let before = sorted_indices(&sample);
        Shuffler::preset(ShufflerKind::Full).apply(&mut sample, &mut Pcg32::seed_from_u64(11));
        assert_eq!(sample.len(), 8);
        assert_eq!(sorted_indices(&sample), before);
    }

    #[test]
    fn test_bookends() {
        for seed in 0..20 {
            let mut sample = c_major();
            Shuffler::preset(ShufflerKind::Bookends).apply(&mut sample, &mut Pcg32::seed_from_u64(seed));
            assert_eq!(sample.entries()[0].as_note().unwrap().index(), 48);
            assert_eq!(sample.entries()[7].as_note().unwrap().index(), 60);
        }
    }

    #[test]
    fn test_bounded_shuffle_leaves_front_alone() {
        let mut items: Vec<u32> = (0..10).collect();
        let bounds = ShuffleBounds { from: Some(TableKey::Index(5)), to: None, limit: None };
        fisher_yates(&mut items, &bounds, &mut Pcg32::seed_from_u64(2));
        assert_eq!(&items[..5], &[0, 1, 2, 3, 4]);
        let mut tail = items[5..].to_vec();
        tail.sort();
        assert_eq!(tail, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_swap_limit() {
        let mut items: Vec<u32> = (0..10).collect();
        let bounds = ShuffleBounds { limit: Some(1), ..ShuffleBounds::default() };
        fisher_yates(&mut items, &bounds, &mut Pcg32::seed_from_u64(4));
        let moved = items.iter().enumerate().filter(|(i, v)| *i as u32 != **v).count();
        assert!(moved == 0 || moved == 2);
    }

    #[test]
    fn test_seam_avoidance() {
        let tonal = generate(0, &GenerateOptions::default()).unwrap();
        let previous = Sample::build(&tonal, BeatUnit::Quarter, None, None);
        let shuffler = Shuffler {
            reorder: false,
            avoid_seam_repeat: true,
            start: WeightedTable::parse(&[("-1", 1.0)]).unwrap(),
            ..Shuffler::default()
        };
        // Start override runs after seam avoidance and wins
        let mut sample = Sample::build(&tonal, BeatUnit::Quarter, None, Some(previous.clone()));
        shuffler.apply(&mut sample, &mut Pcg32::seed_from_u64(8));
        assert_eq!(sample.entries()[0].as_note().unwrap().index(), 60);

        // Without an override the repeated pitch is moved off the front
        let mut reversed = Sample::build(&tonal, BeatUnit::Quarter, None, Some(previous));
        reversed.entries_mut().reverse();
        let plain = Shuffler { reorder: false, avoid_seam_repeat: true, ..Shuffler::default() };
        plain.apply(&mut reversed, &mut Pcg32::seed_from_u64(8));
        assert_ne!(reversed.entries()[0].as_note().unwrap().index(), 60);
    }

    #[test]
    fn test_note_before_hold_rings_open() {
        let shuffler = Shuffler {
            fill: WeightedTable::certain(TableKey::Hold),
            reorder: false,
            ..Shuffler::default()
        };
        let mut opened = 0;
        for seed in 0..20 {
            let mut sample = c_major();
            shuffler.apply(&mut sample, &mut Pcg32::seed_from_u64(seed));
            let entries = sample.entries();
            let hold = entries.iter().position(|e| matches!(e, Entry::Hold)).unwrap();
            for (i, entry) in entries.iter().enumerate() {
                if let Entry::Note(note) = entry {
                    let expected = if i + 1 == hold { Articulation::Open } else { Articulation::Unset };
                    assert_eq!(note.articulation, expected, "seed {} position {}", seed, i);
                    opened += (expected == Articulation::Open) as usize;
                }
            }
        }
        assert!(opened > 0);
    }

    #[test]
    fn test_none_preset_is_identity() {
        let mut sample = c_major();
        let before = sample.entries().to_vec();
        Shuffler::preset(ShufflerKind::None).apply(&mut sample, &mut Pcg32::seed_from_u64(1));
        assert_eq!(sample.entries(), before.as_slice());
    }
}
