//! Geometric-invariant signature hashing over reference label windows.
//!
//! A `Signature` is a coarse, scale-corrected quantization of the
//! projective cross-ratio of a five-label window, chosen because the
//! cross-ratio of four collinear points is invariant to the affine
//! stretch/shrink that separates a molecule's measured spacing from the
//! reference's true spacing. `InvariantIndex::build` visits every
//! five-label window of every reference molecule once, inserting the
//! window's full jittered signature family, and `query` looks up the
//! posting list for one signature.
//!
//! Built once per reference `MapStore` and never mutated afterwards, so a
//! `&InvariantIndex` is `Sync` and can be shared across worker threads
//! behind an `Arc`.

use foldhash::fast::RandomState;
use std::collections::HashMap;

use crate::config::InvariantIndexParams;
use crate::map_store::{Label, MapStore, Molecule, filter_label_indices};

const MODULE: &str = module_path!();

/// Number of labels in a signature window.
pub const WINDOW_LEN: usize = 5;

/// A quantized geometric-invariant signature: the cross-ratio bucket,
/// offset by the window's size-correction term.
pub type Signature = u32;

/// One hit recorded for a signature: which reference molecule, and the
/// index of the first label in the five-label window that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub reference_id: u64,
    pub window_start: usize,
}

/// The built index: a posting list per signature, plus the parameters it
/// was built with (needed so `query` and the anchorer compute signatures
/// the same way `build` did).
#[derive(Debug)]
pub struct InvariantIndex {
    params: InvariantIndexParams,
    postings: HashMap<Signature, Vec<Hit>, RandomState>,
}

/// The cross-ratio of the window's outer three labels and `p0`, skipping
/// `p1` in the formula itself (though `p1` still shapes the jittered
/// variants below, since perturbing the first gap shifts every label
/// after it).
fn cross_ratio(p0: f64, p2: f64, p3: f64, p4: f64) -> f64 {
    ((p3 - p0) * (p4 - p2)) / ((p3 - p2) * (p4 - p0))
}

/// Monotone transform of the cross-ratio into `[0, 1)`. For five strictly
/// increasing positions the cross-ratio computed above is always `>= 1`,
/// so `1 - 1/cr` spans the full unit interval as `cr` ranges over
/// `[1, inf)`, giving even bucket occupancy.
fn cr_cdf(cr: f64) -> f64 {
    if cr.is_finite() && cr > 0.0 { (1.0 - 1.0 / cr).clamp(0.0, 1.0) } else { 0.0 }
}

fn bucket_of(window: [f64; WINDOW_LEN], params: &InvariantIndexParams) -> Signature {
    let [p0, _p1, p2, p3, p4] = window;
    let cr = cross_ratio(p0, p2, p3, p4);
    let cdf = cr_cdf(cr);
    let cr_bucket = ((cdf * params.bin_count as f64) as i64).clamp(0, params.bin_count as i64 - 1);
    let size_term = ((p4 - p0) / params.size_scale).round() as i64;
    (cr_bucket + size_term).max(0) as u32
}

/// Computes the jittered signature family for a five-label window:
/// perturbs each of the four internal gaps independently by `{0, +1}`
/// ("floor" vs "ceil") and recomputes the bucket for every one of the
/// resulting `2^4 = 16` reconstructed windows, deduplicating the result.
///
/// Used identically by [`InvariantIndex::build`] (to insert every variant
/// a matching query window might compute) and by the anchorer (to query
/// every variant a matching reference window might have been inserted
/// under).
pub fn signature_variants(window: [Label; WINDOW_LEN], params: &InvariantIndexParams) -> Vec<Signature> {
    let gaps = [
        window[1] as i64 - window[0] as i64,
        window[2] as i64 - window[1] as i64,
        window[3] as i64 - window[2] as i64,
        window[4] as i64 - window[3] as i64,
    ];

    let mut variants = Vec::with_capacity(16);
    for mask in 0u32..16 {
        let mut pos = window[0] as f64;
        let mut reconstructed = [pos, 0.0, 0.0, 0.0, 0.0];
        for (i, gap) in gaps.iter().enumerate() {
            let jitter = if mask & (1 << i) != 0 { 1 } else { 0 };
            pos += (*gap + jitter) as f64;
            reconstructed[i + 1] = pos;
        }
        variants.push(bucket_of(reconstructed, params));
    }
    variants.sort_unstable();
    variants.dedup();
    variants
}

impl InvariantIndex {
    /// Builds an index over every reference molecule in `store`, scanning
    /// each one's five-label windows and inserting the full jittered
    /// signature family for each.
    ///
    /// Windows are computed over each molecule's labels filtered to
    /// `resolution_min` spacing first, via `filter_label_indices`, so
    /// that sub-resolution label jitter cannot destabilize the signature;
    /// `Hit::window_start` still reports the first label's index in the
    /// molecule's unfiltered label list, which is what every downstream
    /// consumer (the chainer, the region merger, DTW) indexes with.
    pub fn build(store: &MapStore, params: InvariantIndexParams, resolution_min: u32) -> Self {
        let started = std::time::Instant::now();
        eprintln!("{MODULE} # Hashing {} reference molecules...", store.count_ref());

        let mut postings: HashMap<Signature, Vec<Hit>, RandomState> = HashMap::default();
        for reference in store.references() {
            index_molecule(reference, &params, resolution_min, &mut postings);
        }

        eprintln!("{MODULE} # Indexed in {:.2}s ({} distinct signatures)", started.elapsed().as_secs_f64(), postings.len());
        Self { params, postings }
    }

    #[inline]
    pub fn params(&self) -> &InvariantIndexParams {
        &self.params
    }

    /// The posting list for one signature, or an empty slice if the
    /// signature was never seen while building.
    #[inline]
    pub fn query(&self, signature: Signature) -> &[Hit] {
        self.postings.get(&signature).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The number of hits recorded for `signature`, without allocating a
    /// slice reference. Used by the anchorer to implement the
    /// `max_qgrams` repetitive-window skip cheaply.
    #[inline]
    pub fn posting_len(&self, signature: Signature) -> usize {
        self.postings.get(&signature).map(Vec::len).unwrap_or(0)
    }
}

fn index_molecule(
    molecule: &Molecule, params: &InvariantIndexParams, resolution_min: u32,
    postings: &mut HashMap<Signature, Vec<Hit>, RandomState>,
) {
    let labels = molecule.labels();
    let kept = filter_label_indices(molecule, resolution_min);
    if kept.len() < WINDOW_LEN {
        return;
    }
    for start in 0..=(kept.len() - WINDOW_LEN) {
        let indices = &kept[start..start + WINDOW_LEN];
        let window: [Label; WINDOW_LEN] = std::array::from_fn(|i| labels[indices[i]]);
        for sig in signature_variants(window, params) {
            postings.entry(sig).or_default().push(Hit { reference_id: molecule.id(), window_start: indices[0] });
        }
    }
}
