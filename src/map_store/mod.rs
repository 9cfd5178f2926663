//! In-memory store of reference and query molecules.
//!
//! A `Molecule` is an ordered list of label positions ending in a terminal
//! marker equal to its length. `MapStore` owns two such collections, keyed
//! by an opaque `u64` id: a flat `Vec` plus an id-to-index map built once
//! at load time, queried by reference afterwards.

use foldhash::fast::RandomState;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// A single label position, in base pairs from the start of the molecule.
pub type Label = u32;

/// An ordered sequence of label positions, terminated by a marker equal to
/// the molecule's length.
///
/// # Invariants
/// - `labels` is non-decreasing.
/// - `labels.last() == Some(&length_bp)` (the terminal marker).
/// - `labels.len() >= 1` (the terminal marker alone is a valid, if
///   information-free, molecule).
#[derive(Debug, Clone, PartialEq)]
pub struct Molecule {
    id: u64,
    length_bp: u32,
    labels: Vec<Label>,
}

impl Molecule {
    /// Builds a molecule, validating the invariants above.
    ///
    /// `labels` must already include the terminal marker; callers loading
    /// from a file append it themselves if the source format omits it.
    pub fn new(id: u64, length_bp: u32, labels: Vec<Label>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::MalformedInput { molecule_id: id, reason: "empty label list" });
        }
        if !labels.is_sorted() {
            return Err(Error::MalformedInput { molecule_id: id, reason: "label positions are not non-decreasing" });
        }
        if *labels.last().unwrap() != length_bp {
            return Err(Error::MalformedInput {
                molecule_id: id,
                reason: "last label is not a terminal marker equal to molecule length",
            });
        }
        Ok(Self { id, length_bp, labels })
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn length_bp(&self) -> u32 {
        self.length_bp
    }

    /// All label positions, including the trailing terminal marker.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of labels, excluding the terminal marker.
    #[inline]
    pub fn label_count(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }
}

/// A collection of reference and query molecules, keyed by id.
///
/// Built once at load time and treated as read-only afterwards: every
/// lookup method takes `&self`, so a `MapStore` can be shared across
/// `rayon` worker threads without synchronization.
#[derive(Debug, Default)]
pub struct MapStore {
    references: Vec<Molecule>,
    reference_index: HashMap<u64, usize, RandomState>,
    queries: Vec<Molecule>,
    query_index: HashMap<u64, usize, RandomState>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_reference(&mut self, molecule: Molecule) {
        let idx = self.references.len();
        self.reference_index.insert(molecule.id(), idx);
        self.references.push(molecule);
    }

    pub fn insert_query(&mut self, molecule: Molecule) {
        let idx = self.queries.len();
        self.query_index.insert(molecule.id(), idx);
        self.queries.push(molecule);
    }

    #[inline]
    pub fn ref_molecule(&self, id: u64) -> Option<&Molecule> {
        self.reference_index.get(&id).map(|&idx| &self.references[idx])
    }

    #[inline]
    pub fn query_molecule(&self, id: u64) -> Option<&Molecule> {
        self.query_index.get(&id).map(|&idx| &self.queries[idx])
    }

    #[inline]
    pub fn count_ref(&self) -> usize {
        self.references.len()
    }

    #[inline]
    pub fn count_query(&self) -> usize {
        self.queries.len()
    }

    /// All reference molecules, in insertion order. Used by the index
    /// builder, which needs to visit every reference exactly once.
    #[inline]
    pub fn references(&self) -> &[Molecule] {
        &self.references
    }

    /// Query ids present in the store, in insertion order. Used to derive
    /// the default `[start_mol, end_mol)` range when the caller doesn't
    /// override it.
    pub fn query_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.queries.iter().map(Molecule::id)
    }
}

/// A gap sequence: the inter-label distances of a molecule, optionally
/// reversed.
///
/// This is a zero-copy view: `gap_sequence` computes gaps on demand rather
/// than storing them on `Molecule`, since most lookups need only the
/// signature window around one label, not the whole sequence.
#[derive(Debug, Clone, Copy)]
pub struct GapSequence<'a> {
    labels: &'a [Label],
    reverse: bool,
}

impl<'a> GapSequence<'a> {
    /// Number of gaps (one fewer than the number of labels, including the
    /// terminal marker).
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th gap, in forward (as-stored) orientation semantics: the
    /// distance between consecutive labels starting from the molecule's
    /// start if `reverse` is false, or from its end if `reverse` is true.
    #[inline]
    pub fn gap(&self, i: usize) -> u32 {
        let n = self.labels.len();
        if !self.reverse {
            self.labels[i + 1] - self.labels[i]
        } else {
            self.labels[n - 1 - i] - self.labels[n - 2 - i]
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).map(|i| self.gap(i))
    }
}

/// Returns a view over `molecule`'s inter-label gaps, reversed if
/// `reverse` is set: a reverse-strand query is served by reversing its
/// gap sequence rather than building a second index.
pub fn gap_sequence(molecule: &Molecule, reverse: bool) -> GapSequence<'_> {
    GapSequence { labels: molecule.labels(), reverse }
}

/// A view over `molecule`'s labels with any label closer than
/// `min_spacing` bp to its predecessor removed (the terminal marker is
/// always retained). Mirrors `rekit`'s per-label resolution filtering
/// (`nicks_to_frags_bin`) rather than trimming the sequence's ends.
pub fn filter_labels(molecule: &Molecule, min_spacing: u32) -> Vec<Label> {
    filter_label_indices(molecule, min_spacing).into_iter().map(|i| molecule.labels()[i]).collect()
}

/// Same retention rule as [`filter_labels`], but returning the kept
/// labels' indices into `molecule.labels()` rather than their positions.
/// Lets a caller build a filtered view while still being able to report
/// results in terms of the molecule's original label indices.
pub fn filter_label_indices(molecule: &Molecule, min_spacing: u32) -> Vec<usize> {
    let labels = molecule.labels();
    if labels.len() <= 1 {
        return (0..labels.len()).collect();
    }
    let mut kept = Vec::with_capacity(labels.len());
    kept.push(0);
    for (i, &pos) in labels.iter().enumerate().skip(1) {
        let is_terminal = i == labels.len() - 1;
        if is_terminal || pos - labels[*kept.last().unwrap()] >= min_spacing {
            kept.push(i);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn molecule_rejects_unsorted_labels() {
        let err = Molecule::new(1, 100, vec![10, 5, 100]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { molecule_id: 1, .. }));
    }

    #[test]
    fn molecule_rejects_missing_terminal_marker() {
        let err = Molecule::new(1, 100, vec![10, 20]).unwrap_err();
        assert!(matches!(err, Error::MalformedInput { molecule_id: 1, .. }));
    }

    #[test]
    fn molecule_accepts_valid_labels() {
        let mol = Molecule::new(1, 100, vec![10, 40, 100]).unwrap();
        assert_eq!(mol.label_count(), 2);
        assert_eq!(mol.length_bp(), 100);
    }

    #[test]
    fn gap_sequence_forward_matches_differences() {
        let mol = Molecule::new(1, 100, vec![10, 40, 70, 100]).unwrap();
        let gaps: Vec<u32> = gap_sequence(&mol, false).iter().collect();
        assert_eq!(gaps, vec![30, 30, 30]);
    }

    #[test]
    fn gap_sequence_reverse_mirrors_forward() {
        let mol = Molecule::new(1, 100, vec![0, 20, 70, 100]).unwrap();
        let forward: Vec<u32> = gap_sequence(&mol, false).iter().collect();
        let mut reversed: Vec<u32> = gap_sequence(&mol, true).iter().collect();
        reversed.reverse();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn filter_labels_drops_close_labels_but_keeps_terminal() {
        let mol = Molecule::new(1, 100, vec![0, 10, 15, 90, 100]).unwrap();
        let kept = filter_labels(&mol, 20);
        assert_eq!(kept, vec![0, 90, 100]);
    }

    #[test]
    fn filter_label_indices_matches_filter_labels_positions() {
        let mol = Molecule::new(1, 100, vec![0, 10, 15, 90, 100]).unwrap();
        let indices = filter_label_indices(&mol, 20);
        assert_eq!(indices, vec![0, 3, 4]);
        let positions: Vec<Label> = indices.iter().map(|&i| mol.labels()[i]).collect();
        assert_eq!(positions, filter_labels(&mol, 20));
    }

    #[test]
    fn map_store_round_trips_by_id() {
        let mut store = MapStore::new();
        store.insert_reference(Molecule::new(7, 500, vec![100, 500]).unwrap());
        store.insert_query(Molecule::new(9, 300, vec![50, 300]).unwrap());

        assert_eq!(store.ref_molecule(7).map(Molecule::id), Some(7));
        assert_eq!(store.query_molecule(9).map(Molecule::id), Some(9));
        assert!(store.ref_molecule(9).is_none());
        assert_eq!(store.count_ref(), 1);
        assert_eq!(store.count_query(), 1);
    }
}
