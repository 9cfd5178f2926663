//! The `align` subcommand: loads a reference map and query molecule file,
//! builds the [`InvariantIndex`], and runs the [`AlignmentDriver`] over
//! every requested query, emitting tab-separated alignment records.
//!
//! A `parse_*_args` validation step, an optional `--single-thread` pool
//! override, and a threaded writer so concurrent workers never
//! interleave output.

mod arg_parsing;
mod writer;

pub use arg_parsing::AlignArgs;
use arg_parsing::{ParsedAlignArgs, parse_align_args};
use writer::AlignmentWriter;

#[cfg(not(feature = "dev_no_rayon"))]
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::driver::AlignmentDriver;
use crate::invariant_index::InvariantIndex;
use crate::io::{create_writer, molecule_loader::load_map_file};
use crate::map_store::MapStore;

const MODULE: &str = module_path!();

/// Run-wide tallies accumulated across every query, for the end-of-run
/// summary line. Plain atomics rather than a `Mutex`, since `rayon`
/// workers only ever add to them and a final `Ordering::Relaxed` load
/// after the pool has drained is all the summary needs.
#[derive(Default)]
struct RunStats {
    below_min_labels: AtomicUsize,
    anchor_windows_skipped: AtomicUsize,
    alignments_emitted: AtomicUsize,
}

/// Runs the `align` subcommand end to end.
pub fn align_process(args: AlignArgs) -> std::io::Result<()> {
    let ParsedAlignArgs {
        reference_file,
        query_file,
        output,
        config,
        #[cfg(not(feature = "dev_no_rayon"))]
        single_thread,
        unordered,
    } = parse_align_args(args);

    #[cfg(not(feature = "dev_no_rayon"))]
    if single_thread {
        rayon::ThreadPoolBuilder::new().num_threads(1).build_global().ok();
    }

    let reference_map = load_map_file(&reference_file)?;
    let query_map = load_map_file(&query_file)?;

    eprintln!(
        "{MODULE} # Loaded {} reference molecule(s) ({} skipped) and {} query molecule(s) ({} skipped)",
        reference_map.molecules.len(),
        reference_map.skipped,
        query_map.molecules.len(),
        query_map.skipped,
    );

    let mut store = MapStore::new();
    for reference in reference_map.molecules {
        store.insert_reference(reference);
    }
    for query in query_map.molecules {
        store.insert_query(query);
    }

    let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
    let driver = AlignmentDriver::new(&store, &index, &config);

    let mut query_ids: Vec<u64> =
        store.query_ids().filter(|&id| id >= config.start_mol && id <= config.end_mol).collect();
    query_ids.sort_unstable();

    let writer = create_writer(output.as_ref())?;
    let output_writer = AlignmentWriter::spawn(writer, !unordered);
    let stats = RunStats::default();

    if !reference_map.recognition_sites.is_empty() {
        let header = format!("#{}", reference_map.recognition_sites.join(" "));
        output_writer.write(0, vec![header]);
        // Shift every real record's index by one so the header always
        // sorts first in the reorder buffer.
        run_queries(&driver, &query_ids, &output_writer, 1, config.min_labels, &stats);
    } else {
        run_queries(&driver, &query_ids, &output_writer, 0, config.min_labels, &stats);
    }

    output_writer.finish()?;

    eprintln!(
        "{MODULE} # Aligned {} quer{} ({} below min_labels, {} anchor window(s) skipped as repetitive, {} alignment(s) emitted)",
        query_ids.len(),
        if query_ids.len() == 1 { "y" } else { "ies" },
        stats.below_min_labels.load(Ordering::Relaxed),
        stats.anchor_windows_skipped.load(Ordering::Relaxed),
        stats.alignments_emitted.load(Ordering::Relaxed),
    );

    Ok(())
}

/// Dispatches one query per index in `query_ids`, writing each query's
/// records through `output_writer` tagged with `offset + index` and
/// folding its outcome into `stats`.
fn run_queries(
    driver: &AlignmentDriver<'_>, query_ids: &[u64], output_writer: &AlignmentWriter, offset: usize, min_labels: usize,
    stats: &RunStats,
) {
    let dispatch = |i: usize, query_id: u64, writer: &AlignmentWriter| {
        let lines = match driver.align_query(query_id) {
            Some(outcome) => {
                stats.anchor_windows_skipped.fetch_add(outcome.anchor_windows_skipped, Ordering::Relaxed);

                let mut emitted = 0usize;
                let mut below_min_labels = false;
                for record in &outcome.records {
                    if record.reference_id.is_some() {
                        emitted += 1;
                    } else if record.query_label_count < min_labels {
                        below_min_labels = true;
                    }
                }
                stats.alignments_emitted.fetch_add(emitted, Ordering::Relaxed);
                if below_min_labels {
                    stats.below_min_labels.fetch_add(1, Ordering::Relaxed);
                }

                outcome.records.iter().map(ToString::to_string).collect()
            }
            None => Vec::new(),
        };
        writer.write(offset + i, lines);
    };

    #[cfg(not(feature = "dev_no_rayon"))]
    {
        // `Sender` is not `Sync`, so each worker gets its own cloned handle
        // rather than sharing `output_writer` by reference; `stats` is
        // plain atomics, so it's shared by reference across workers.
        (0..query_ids.len()).into_par_iter().for_each_with(output_writer.clone(), |writer, i| {
            dispatch(i, query_ids[i], writer);
        });
    }

    #[cfg(feature = "dev_no_rayon")]
    {
        for (i, &query_id) in query_ids.iter().enumerate() {
            dispatch(i, query_id, output_writer);
        }
    }
}
