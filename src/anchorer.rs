//! Turns query/reference signature collisions into candidate anchor pairs.
//!
//! For each five-label window of the query's gap sequence, this queries
//! the [`InvariantIndex`] with the window's jittered signature family and
//! unions the resulting hits into one `AnchorPair` per (target reference,
//! query window, target window) triple. Windows whose posting list exceeds
//! `max_qgrams` are treated as repetitive and silently skipped, matching
//! `hash.c`'s `lookup` behavior in the original tool.

use foldhash::fast::RandomState;
use std::collections::HashMap;

use crate::config::InvariantIndexParams;
use crate::invariant_index::{InvariantIndex, WINDOW_LEN, signature_variants};
use crate::map_store::{Label, Molecule};

/// One candidate correspondence between a query label index and a
/// reference label index, both naming the first label of the five-label
/// window that produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPair {
    pub qpos: u32,
    pub tpos: u32,
}

/// Proposes anchor pairs for `query` (in the given orientation) against
/// every reference indexed in `index`, grouped by reference id.
///
/// `reverse` mirrors the query's label positions before windowing: a
/// reverse-strand query is handled by reversing the query rather than
/// rebuilding the index. Returns the anchors by target id plus a count
/// of windows skipped as repetitive, which the driver aggregates into its
/// end-of-run summary line.
pub fn propose_anchors(
    query: &Molecule, reverse: bool, index: &InvariantIndex, params: &InvariantIndexParams, max_qgrams: usize,
) -> (HashMap<u64, Vec<AnchorPair>, RandomState>, usize) {
    let labels = query.labels();
    let mut by_target: HashMap<u64, Vec<AnchorPair>, RandomState> = HashMap::default();
    let mut skipped = 0usize;

    if labels.len() < WINDOW_LEN {
        return (by_target, skipped);
    }

    let effective = if reverse { reversed_labels(labels) } else { labels.to_vec() };

    for start in 0..=(effective.len() - WINDOW_LEN) {
        let window: [Label; WINDOW_LEN] = effective[start..start + WINDOW_LEN].try_into().unwrap();
        for sig in signature_variants(window, params) {
            if index.posting_len(sig) > max_qgrams {
                skipped += 1;
                continue;
            }
            for hit in index.query(sig) {
                let bucket = by_target.entry(hit.reference_id).or_default();
                let anchor = AnchorPair { qpos: start as u32, tpos: hit.window_start as u32 };
                // Tail-only dedup: suppress a repeat of the immediately
                // preceding (qpos, tpos) pair, not a full-list dedup.
                if bucket.last() != Some(&anchor) {
                    bucket.push(anchor);
                }
            }
        }
    }

    (by_target, skipped)
}

pub(crate) fn reversed_labels(labels: &[u32]) -> Vec<u32> {
    let length = *labels.last().unwrap();
    labels.iter().rev().map(|&pos| length - pos).collect()
}
