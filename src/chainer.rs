//! Collinear chaining: picks maximal-score, order-preserving subsequences
//! of anchor pairs, across every reference a query hit.
//!
//! Ported numerically from the original tool's `do_chain`: each target's
//! anchors get an independent bounded look-back linear DP (scoring each
//! anchor against its best compatible predecessor within the last `h`
//! anchors in target-position order), then every target's DP positions
//! are pooled into one score-descending list and chains are recovered
//! greedily from it, marking anchors used as they're claimed so no anchor
//! is claimed by two emitted chains — even across targets.

use foldhash::fast::RandomState;
use std::collections::HashMap;

use crate::anchorer::AnchorPair;
use crate::error::{Error, Result};

/// Look-back window (`h` in the original recurrence): how many preceding
/// anchors, in target-position order, are considered as a predecessor.
const LOOKBACK: usize = 50;

/// A chain of anchors, in increasing qpos/tpos order, plus its score.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub reference_id: u64,
    pub anchors: Vec<AnchorPair>,
    pub score: f64,
}

/// The cost of skipping from one anchor to the next, penalizing the
/// difference between the query-side and target-side gap (a proxy for an
/// indel between the two), following the original's
/// `0.01 * match_score * diffdiff + 0.5 * log2(diffdiff)` formula.
fn gap_cost(match_score: i32, qdiff: i64, tdiff: i64) -> f64 {
    let diffdiff = (qdiff - tdiff).unsigned_abs();
    if diffdiff == 0 {
        0.0
    } else {
        0.01 * match_score as f64 * diffdiff as f64 + 0.5 * (diffdiff as f64).log2()
    }
}

/// One target's independently-computed chaining DP.
struct TargetDp {
    reference_id: u64,
    sorted: Vec<AnchorPair>,
    score: Vec<f64>,
    pred: Vec<Option<usize>>,
}

fn dp_for_target(reference_id: u64, anchors: &[AnchorPair], match_score: i32, max_gap: u32) -> TargetDp {
    let mut sorted = anchors.to_vec();
    sorted.sort_unstable_by_key(|a| (a.tpos, a.qpos));
    sorted.dedup();

    let n = sorted.len();
    let mut score = vec![0.0f64; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];
    let m = match_score as i64;

    for i in 0..n {
        let lo = i.saturating_sub(LOOKBACK);
        let mut best_score: Option<f64> = None;
        let mut best_pred: Option<usize> = None;

        for j in (lo..i).rev() {
            if sorted[j].qpos >= sorted[i].qpos || sorted[j].tpos >= sorted[i].tpos {
                continue;
            }
            let qdiff = sorted[i].qpos as i64 - sorted[j].qpos as i64;
            let tdiff = sorted[i].tpos as i64 - sorted[j].tpos as i64;
            if qdiff > max_gap as i64 || tdiff > max_gap as i64 {
                continue;
            }
            let gap = gap_cost(match_score, qdiff, tdiff);
            let candidate = score[j] + qdiff.min(tdiff).min(m) as f64 - gap;
            if best_score.is_none_or(|b| candidate > b) {
                best_score = Some(candidate);
                best_pred = Some(j);
            }
        }

        score[i] = best_score.unwrap_or(match_score as f64);
        pred[i] = best_pred;
    }

    TargetDp { reference_id, sorted, score, pred }
}

/// Chains anchors across every target a query hit in one orientation,
/// returning at most `max_chains` chains of length `>= min_chain_length`,
/// sorted by score descending.
pub fn chain_targets(
    anchors_by_target: &HashMap<u64, Vec<AnchorPair>, RandomState>, match_score: i32, max_gap: u32, min_chain_length: usize,
    max_chains: usize,
) -> Result<Vec<Chain>> {
    let mut dps: Vec<TargetDp> = anchors_by_target
        .iter()
        .filter(|(_, anchors)| !anchors.is_empty())
        .map(|(&reference_id, anchors)| dp_for_target(reference_id, anchors, match_score, max_gap))
        .collect();
    // Deterministic target ordering so ties in score produce stable output.
    dps.sort_unstable_by_key(|dp| dp.reference_id);

    let mut global_order: Vec<(usize, usize)> =
        dps.iter().enumerate().flat_map(|(d, dp)| (0..dp.sorted.len()).map(move |i| (d, i))).collect();
    global_order.sort_unstable_by(|&(d1, i1), &(d2, i2)| {
        dps[d2].score[i2].partial_cmp(&dps[d1].score[i1]).unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut used: Vec<Vec<bool>> = dps.iter().map(|dp| vec![false; dp.sorted.len()]).collect();
    let mut chains = Vec::new();

    for (d, start) in global_order {
        if used[d][start] {
            continue;
        }
        let mut members = Vec::new();
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            if idx >= dps[d].sorted.len() {
                return Err(Error::IndexInconsistency { reference_id: dps[d].reference_id });
            }
            if used[d][idx] {
                break;
            }
            used[d][idx] = true;
            members.push(idx);
            cursor = dps[d].pred[idx];
        }
        members.reverse();
        if members.len() < min_chain_length {
            continue;
        }
        let chain_score = dps[d].score[start];
        chains.push(Chain {
            reference_id: dps[d].reference_id,
            anchors: members.into_iter().map(|i| dps[d].sorted[i]).collect(),
            score: chain_score,
        });
        if chains.len() >= max_chains {
            break;
        }
    }

    chains.sort_unstable_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    Ok(chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(qpos: u32, tpos: u32) -> AnchorPair {
        AnchorPair { qpos, tpos }
    }

    fn single_target(id: u64, anchors: Vec<AnchorPair>) -> HashMap<u64, Vec<AnchorPair>, RandomState> {
        let mut map: HashMap<u64, Vec<AnchorPair>, RandomState> = HashMap::default();
        map.insert(id, anchors);
        map
    }

    #[test]
    fn chains_a_clean_collinear_run() {
        let anchors = vec![anchor(0, 100), anchor(1, 130), anchor(2, 160), anchor(3, 190)];
        let chains = chain_targets(&single_target(1, anchors), 4, 50, 2, 10).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].anchors.len(), 4);
        assert!(chains[0].score > 0.0);
    }

    #[test]
    fn rejects_anchors_exceeding_max_gap() {
        let anchors = vec![anchor(0, 100), anchor(1, 100_000)];
        let chains = chain_targets(&single_target(1, anchors), 4, 50, 2, 10).unwrap();
        assert!(chains.is_empty());
    }

    #[test]
    fn drops_chains_shorter_than_min_length() {
        let anchors = vec![anchor(0, 100), anchor(5, 500)];
        let chains = chain_targets(&single_target(1, anchors), 4, 50, 3, 10).unwrap();
        assert!(chains.is_empty());
    }

    #[test]
    fn non_collinear_anchors_split_into_separate_chains() {
        let anchors = vec![anchor(0, 100), anchor(1, 130), anchor(2, 160), anchor(10, 50), anchor(11, 80), anchor(12, 110)];
        let chains = chain_targets(&single_target(1, anchors), 4, 50, 2, 10).unwrap();
        assert_eq!(chains.len(), 2);
        for chain in &chains {
            assert!(chain.anchors.windows(2).all(|w| w[0].tpos < w[1].tpos && w[0].qpos < w[1].qpos));
        }
    }

    #[test]
    fn chains_are_kept_separate_per_reference() {
        let mut map: HashMap<u64, Vec<AnchorPair>, RandomState> = HashMap::default();
        map.insert(1, vec![anchor(0, 100), anchor(1, 130), anchor(2, 160)]);
        map.insert(2, vec![anchor(0, 500), anchor(1, 530), anchor(2, 560)]);
        let chains = chain_targets(&map, 4, 50, 2, 10).unwrap();
        assert_eq!(chains.len(), 2);
        assert!(chains.iter().any(|c| c.reference_id == 1));
        assert!(chains.iter().any(|c| c.reference_id == 2));
    }

    #[test]
    fn respects_max_chains_limit_globally() {
        let mut map: HashMap<u64, Vec<AnchorPair>, RandomState> = HashMap::default();
        map.insert(1, vec![anchor(0, 100), anchor(10, 10_000)]);
        map.insert(2, vec![anchor(0, 500), anchor(10, 20_000)]);
        let chains = chain_targets(&map, 4, 50, 1, 1).unwrap();
        assert_eq!(chains.len(), 1);
    }
}
