//! Expands chains into candidate alignment regions and merges overlapping
//! ones so DTW refines each distinct area of the reference once.
//!
//! Each chain's anchor span is expanded into an estimated reference bp
//! range wide enough to plausibly cover the whole query, then translated
//! into a reference label-index range by walking outward from the
//! chain's own anchors until the walked label's position crosses the
//! estimate (clamped to the reference's own label indices). Regions whose
//! index ranges overlap — directly or transitively — are unioned into
//! one, carrying along every chain that contributed to it.

use crate::anchorer::reversed_labels;
use crate::chainer::Chain;
use crate::map_store::Molecule;

/// A merged candidate region: a reference label-index span plus every
/// chain that overlaps it.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub reference_id: u64,
    pub t_start_idx: usize,
    pub t_end_idx: usize,
    pub chains: Vec<Chain>,
}

/// Computes one chain's estimated reference label-index span.
///
/// `reverse` selects which label frame `qpos` indexes into: the anchorer
/// builds its anchors from `reversed_labels(query.labels())` for a
/// reverse-orientation pass (`anchorer::propose_anchors`), so a chain's
/// `qpos` values are indices into that reversed view, not into
/// `query.labels()` itself. Mixing the two frames here would estimate the
/// reference span from the wrong query coordinate.
fn widen(chain: &Chain, query: &Molecule, reference: &Molecule, reverse: bool) -> (usize, usize) {
    let first = chain.anchors.first().expect("chains are never empty");
    let last = chain.anchors.last().expect("chains are never empty");

    let owned_labels;
    let q_labels: &[u32] = if reverse {
        owned_labels = reversed_labels(query.labels());
        &owned_labels
    } else {
        query.labels()
    };
    let t_labels = reference.labels();
    let last_idx = t_labels.len() - 1;

    let q_first_pos = q_labels[first.qpos as usize] as i64;
    let t_first_pos = t_labels[first.tpos as usize] as i64;
    let q_last_pos = q_labels[last.qpos as usize] as i64;
    let t_last_pos = t_labels[last.tpos as usize] as i64;
    let query_length = query.length_bp() as i64;

    let est_t_start = t_first_pos - q_first_pos;
    let est_t_end = t_last_pos + (query_length - q_last_pos);

    let mut start_idx = first.tpos as usize;
    while start_idx > 0 && t_labels[start_idx - 1] as i64 >= est_t_start {
        start_idx -= 1;
    }
    let mut end_idx = last.tpos as usize;
    while end_idx < last_idx && t_labels[end_idx + 1] as i64 <= est_t_end {
        end_idx += 1;
    }

    (start_idx, end_idx)
}

/// Merges `chains` (all against the same reference, from one query
/// orientation) into overlap-closed regions. Chains with fewer than
/// `chain_threshold` anchors are dropped before widening: a minimum
/// evidence gate for attempting DTW at all.
///
/// `reverse` must match the orientation the chains' anchors were produced
/// in (see [`widen`]), so the estimated span is computed in the same
/// query-label frame the anchorer used.
pub fn merge_regions(
    chains: Vec<Chain>, query: &Molecule, reference: &Molecule, chain_threshold: usize, reverse: bool,
) -> Vec<Region> {
    let mut spans: Vec<(usize, usize, Chain)> = chains
        .into_iter()
        .filter(|chain| chain.anchors.len() >= chain_threshold)
        .map(|chain| {
            let (lo, hi) = widen(&chain, query, reference, reverse);
            (lo, hi, chain)
        })
        .collect();
    if spans.is_empty() {
        return Vec::new();
    }
    spans.sort_unstable_by_key(|(lo, _, _)| *lo);

    let reference_id = reference.id();
    let mut regions: Vec<Region> = Vec::new();
    for (lo, hi, chain) in spans.drain(..) {
        if let Some(last) = regions.last_mut()
            && lo <= last.t_end_idx
        {
            last.t_end_idx = last.t_end_idx.max(hi);
            last.chains.push(chain);
            continue;
        }
        regions.push(Region { reference_id, t_start_idx: lo, t_end_idx: hi, chains: vec![chain] });
    }

    // A merge can bring a later region's start back under an earlier
    // region's (now-extended) end, so a second transitive pass catches
    // any overlaps the single left-to-right sweep missed.
    loop {
        let mut merged_any = false;
        let mut next: Vec<Region> = Vec::with_capacity(regions.len());
        for region in regions.drain(..) {
            if let Some(last) = next.last_mut()
                && region.t_start_idx <= last.t_end_idx
            {
                last.t_end_idx = last.t_end_idx.max(region.t_end_idx);
                last.chains.extend(region.chains);
                merged_any = true;
                continue;
            }
            next.push(region);
        }
        regions = next;
        if !merged_any {
            break;
        }
    }

    regions
}
