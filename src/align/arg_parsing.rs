//! Command-line surface for the `align` subcommand, and the validation
//! step that turns raw [`AlignArgs`] into a plain [`Config`].
//!
//! A `clap`-derived args struct, a `parse_*_args` function that validates
//! it into a plain config struct, and [`abort_clap`] for programmer-visible
//! misconfiguration rather than a `Result` the caller has to format
//! itself.

use clap::{Args, error::ErrorKind};
use std::path::PathBuf;

use crate::args::abort_clap;
use crate::config::{Config, DtwParams, InvariantIndexParams};

const SUBCOMMAND: &str = "align";

/// Command-line arguments for `align`: aligns query molecules against a
/// reference map via geometric-invariant hashing, collinear chaining, and
/// DTW refinement.
#[derive(Args, Debug)]
pub struct AlignArgs {
    /// Path to the reference map file (tab-delimited molecules; a leading
    /// `#` line may carry recognition-site strings).
    pub reference_file: PathBuf,

    /// Path to the query molecule file (same tab-delimited format).
    pub query_file: PathBuf,

    #[arg(long, alias = "out")]
    /// Output path for alignment records. Written to stdout if not given.
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = 11)]
    /// Minimum label count for a query to be eligible for alignment.
    pub min_labels: usize,

    #[arg(long, default_value_t = 1)]
    /// Minimum anchor count for a chain to reach the region merger.
    pub chain_threshold: usize,

    #[arg(long, default_value_t = 5.0)]
    /// Minimum DTW score required to emit an alignment.
    pub dtw_threshold: f64,

    #[arg(long, default_value_t = 2_000_000_000)]
    /// Posting lists longer than this are treated as repetitive and skipped.
    pub max_qgrams: usize,

    #[arg(long, default_value_t = 100)]
    /// Number of signature buckets the cross-ratio component scales into.
    pub bin_size: u32,

    #[arg(long, default_value_t = 2000.0)]
    /// Size scale (`S`) of the signature's size-correction term.
    pub size_scale: f64,

    #[arg(long, default_value_t = 500)]
    /// Minimum label spacing retained during index construction.
    pub resolution_min: u32,

    #[arg(long, default_value_t = 0)]
    /// Inclusive start of the query id range to process.
    pub start_mol: u64,

    /// Inclusive end of the query id range to process. Defaults to the
    /// largest query id in the file.
    #[arg(long)]
    pub end_mol: Option<u64>,

    #[arg(long)]
    /// Maximum number of chains to emit per query per orientation. Unbounded
    /// if not given.
    pub max_chains: Option<usize>,

    #[arg(long, default_value_t = 3)]
    /// Maximum number of alignments to emit per query.
    pub max_alignments: usize,

    #[arg(long, default_value_t = 50)]
    /// Maximum qpos/tpos delta allowed between chained anchors.
    pub max_gap: u32,

    #[arg(long, default_value_t = 3)]
    /// Minimum anchor count for a chain to be emitted at all.
    pub min_chain_length: usize,

    #[arg(long, default_value_t = 4)]
    /// `M` in the chaining DP recurrence.
    pub match_score: i32,

    #[arg(long, default_value_t = 0.2)]
    /// DTW match-score tolerance: a fraction of the target gap if `< 1.0`,
    /// else an absolute base-pair tolerance.
    pub neutral_deviation: f64,

    #[arg(long, default_value_t = -1.0)]
    /// DTW insertion cost (expected `<= 0`).
    pub ins_score: f64,

    #[arg(long, default_value_t = -1.0)]
    /// DTW deletion cost (expected `<= 0`).
    pub del_score: f64,

    #[arg(long, default_value_t = 0.1)]
    /// Bonus added to the DTW `qmatch` variant.
    pub qmatch_bonus: f64,

    #[arg(long, default_value_t = 0.1)]
    /// Bonus added to the DTW `tmatch` variant.
    pub tmatch_bonus: f64,

    #[arg(long, default_value_t = 0.2)]
    /// Bonus added to the DTW `qtmatch` variant.
    pub qtmatch_bonus: f64,

    #[arg(long)]
    /// Run single-threaded instead of over a `rayon` pool.
    #[cfg(not(feature = "dev_no_rayon"))]
    pub single_thread: bool,

    #[arg(long)]
    /// Skip the query-id-ascending reorder buffer, writing records as soon
    /// as each query finishes instead. Faster, but output order across
    /// queries is no longer reproducible between runs.
    pub unordered: bool,
}

/// The validated configuration and file paths for one `align` run.
pub struct ParsedAlignArgs {
    pub reference_file: PathBuf,
    pub query_file: PathBuf,
    pub output: Option<PathBuf>,
    pub config: Config,
    #[cfg(not(feature = "dev_no_rayon"))]
    pub single_thread: bool,
    pub unordered: bool,
}

/// Validates `args` into a [`ParsedAlignArgs`].
///
/// [`abort_clap`] is called if `start_mol > end_mol` (when `end_mol` is
/// given), `bin_size == 0`, or `max_alignments == 0`: all are
/// programmer-visible misconfiguration rather than data the core can
/// degrade gracefully on.
pub fn parse_align_args(args: AlignArgs) -> ParsedAlignArgs {
    if let Some(end_mol) = args.end_mol
        && args.start_mol > end_mol
    {
        abort_clap(
            ErrorKind::InvalidValue,
            format!("--start-mol ({}) must be <= --end-mol ({end_mol})", args.start_mol),
            Some(SUBCOMMAND),
        );
    }

    if args.bin_size == 0 {
        abort_clap(ErrorKind::InvalidValue, "--bin-size must be greater than 0", Some(SUBCOMMAND));
    }

    if args.max_alignments == 0 {
        abort_clap(ErrorKind::InvalidValue, "--max-alignments must be greater than 0", Some(SUBCOMMAND));
    }

    let config = Config {
        min_labels: args.min_labels,
        chain_threshold: args.chain_threshold,
        dtw_threshold: args.dtw_threshold,
        max_qgrams: args.max_qgrams,
        resolution_min: args.resolution_min,
        start_mol: args.start_mol,
        end_mol: args.end_mol.unwrap_or(u64::MAX),
        max_chains: args.max_chains.unwrap_or(usize::MAX),
        max_alignments: args.max_alignments,
        max_gap: args.max_gap,
        min_chain_length: args.min_chain_length,
        match_score: args.match_score,
        dtw: DtwParams {
            neutral_deviation: args.neutral_deviation,
            ins_score: args.ins_score,
            del_score: args.del_score,
            qmatch_bonus: args.qmatch_bonus,
            tmatch_bonus: args.tmatch_bonus,
            qtmatch_bonus: args.qtmatch_bonus,
        },
        invariant_index: InvariantIndexParams { bin_count: args.bin_size, size_scale: args.size_scale },
    };

    ParsedAlignArgs {
        reference_file: args.reference_file,
        query_file: args.query_file,
        output: args.output,
        config,
        #[cfg(not(feature = "dev_no_rayon"))]
        single_thread: args.single_thread,
        unordered: args.unordered,
    }
}
