//! Configuration for the alignment pipeline.
//!
//! A plain struct holding validated, already-defaulted values, produced
//! from the `clap` args by `align::parse_align_args` rather than
//! constructed directly from user input.

/// Tunables recognized by the driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Minimum label count for a query to be eligible for alignment.
    pub min_labels: usize,
    /// Minimum anchor count for a chain to be handed to the region merger.
    pub chain_threshold: usize,
    /// Minimum DTW score to emit an alignment.
    pub dtw_threshold: f64,
    /// Posting lists longer than this are treated as repetitive and skipped.
    pub max_qgrams: usize,
    /// Minimum label spacing retained by `filter_labels` during indexing.
    pub resolution_min: u32,
    /// Inclusive start of the query id range to process.
    pub start_mol: u64,
    /// Inclusive end of the query id range to process.
    pub end_mol: u64,
    /// Maximum number of chains to emit per query per orientation.
    pub max_chains: usize,
    /// Maximum number of alignments to emit per query.
    pub max_alignments: usize,
    /// Maximum qpos/tpos delta allowed between chained anchors.
    pub max_gap: u32,
    /// Minimum anchor count for a chain to be emitted at all.
    pub min_chain_length: usize,
    /// `M` in the chaining DP recurrence.
    pub match_score: i32,
    /// DTW, chaining, and signature model parameters broken out below.
    pub dtw: DtwParams,
    pub invariant_index: InvariantIndexParams,
}

/// Parameters of the DTW recurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DtwParams {
    /// Relative/absolute tolerance switch point and scale for the match
    /// score `sigma`. Values below 1.0 are interpreted as a fraction of the
    /// target gap size; values >= 1.0 are an absolute bp tolerance.
    pub neutral_deviation: f64,
    /// Cost of an INS step (expected to be <= 0).
    pub ins_score: f64,
    /// Cost of a DEL step (expected to be <= 0).
    pub del_score: f64,
    /// Bonus added to the `qmatch` variant.
    pub qmatch_bonus: f64,
    /// Bonus added to the `tmatch` variant.
    pub tmatch_bonus: f64,
    /// Bonus added to the `qtmatch` variant.
    pub qtmatch_bonus: f64,
}

/// Parameters of the geometric-invariant signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvariantIndexParams {
    /// Number of buckets (`B`) the cross-ratio CDF is scaled into.
    pub bin_count: u32,
    /// Size scale (`S`) used by the size-correction term.
    pub size_scale: f64,
}

impl Default for DtwParams {
    fn default() -> Self {
        Self {
            neutral_deviation: 0.2,
            ins_score: -1.0,
            del_score: -1.0,
            qmatch_bonus: 0.1,
            tmatch_bonus: 0.1,
            qtmatch_bonus: 0.2,
        }
    }
}

impl Default for InvariantIndexParams {
    fn default() -> Self {
        Self {
            bin_count: 100,
            size_scale: 2000.0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_labels: 11,
            chain_threshold: 1,
            dtw_threshold: 5.0,
            max_qgrams: 2_000_000_000,
            resolution_min: 500,
            start_mol: 0,
            end_mol: u64::MAX,
            max_chains: usize::MAX,
            max_alignments: 3,
            max_gap: 50,
            min_chain_length: 3,
            match_score: 4,
            dtw: DtwParams::default(),
            invariant_index: InvariantIndexParams::default(),
        }
    }
}
