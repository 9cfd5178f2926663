//! Per-query orchestration: anchor, chain, merge, and refine a query
//! against the reference index, in both orientations, emitting the
//! ranked top-K alignment records for one query.

use foldhash::fast::RandomState;
use std::collections::HashMap;
use std::fmt;

use crate::anchorer::propose_anchors;
use crate::chainer::chain_targets;
use crate::config::Config;
use crate::dtw::{self, DtwStep};
use crate::invariant_index::InvariantIndex;
use crate::map_store::{MapStore, Molecule, gap_sequence};
use crate::region_merger::merge_regions;

const MODULE: &str = module_path!();

/// One emitted tab-separated output record, or a
/// "no alignment" placeholder when every field but query id, query label
/// count, and query length is unset.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub query_id: u64,
    pub reference_id: Option<u64>,
    pub query_reverse: Option<bool>,
    pub query_start_label_idx: Option<usize>,
    pub query_end_label_idx: Option<usize>,
    pub query_label_count: usize,
    pub query_start_pos: Option<u32>,
    pub query_end_pos: Option<u32>,
    pub query_length_bp: u32,
    pub reference_start_label_idx: Option<usize>,
    pub reference_end_label_idx: Option<usize>,
    pub reference_label_count: Option<usize>,
    pub reference_start_pos: Option<u32>,
    pub reference_end_pos: Option<u32>,
    pub reference_length_bp: Option<u32>,
    pub score: Option<f64>,
    pub path: Option<String>,
}

impl AlignmentRecord {
    fn placeholder(query: &Molecule) -> Self {
        Self {
            query_id: query.id(),
            reference_id: None,
            query_reverse: None,
            query_start_label_idx: None,
            query_end_label_idx: None,
            query_label_count: query.label_count(),
            query_start_pos: None,
            query_end_pos: None,
            query_length_bp: query.length_bp(),
            reference_start_label_idx: None,
            reference_end_label_idx: None,
            reference_label_count: None,
            reference_start_pos: None,
            reference_end_pos: None,
            reference_length_bp: None,
            score: None,
            path: None,
        }
    }
}

fn opt<T: fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

impl fmt::Display for AlignmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.query_id,
            opt(self.reference_id),
            opt(self.query_reverse.map(|b| b as u8)),
            opt(self.query_start_label_idx),
            opt(self.query_end_label_idx),
            self.query_label_count,
            opt(self.query_start_pos),
            opt(self.query_end_pos),
            self.query_length_bp,
            opt(self.reference_start_label_idx),
            opt(self.reference_end_label_idx),
            opt(self.reference_label_count),
            opt(self.reference_start_pos),
            opt(self.reference_end_pos),
            opt(self.reference_length_bp),
            opt(self.score),
            opt(self.path.clone()),
        )
    }
}

fn path_to_string(path: &[DtwStep]) -> String {
    path.iter()
        .map(|s| match s {
            DtwStep::Match => '.',
            DtwStep::Ins => 'I',
            DtwStep::Del => 'D',
        })
        .collect()
}

/// The result of aligning one query: its emitted records plus bookkeeping
/// the caller aggregates into the end-of-run summary line.
pub struct QueryOutcome {
    pub records: Vec<AlignmentRecord>,
    pub anchor_windows_skipped: usize,
}

/// Orchestrates the whole pipeline (anchor -> chain -> merge -> DTW) for
/// one query, in both orientations, against every reference the index
/// covers.
pub struct AlignmentDriver<'a> {
    store: &'a MapStore,
    index: &'a InvariantIndex,
    config: &'a Config,
}

impl<'a> AlignmentDriver<'a> {
    pub fn new(store: &'a MapStore, index: &'a InvariantIndex, config: &'a Config) -> Self {
        Self { store, index, config }
    }

    /// Aligns the query with the given id, or `None` if it's absent from
    /// the store (the caller's id range is expected to come from
    /// `MapStore::query_ids`, so this should not normally happen).
    pub fn align_query(&self, query_id: u64) -> Option<QueryOutcome> {
        let query = self.store.query_molecule(query_id)?;

        if query.label_count() < self.config.min_labels {
            return Some(QueryOutcome { records: vec![AlignmentRecord::placeholder(query)], anchor_windows_skipped: 0 });
        }

        let query_gaps: Vec<u32> = gap_sequence(query, false).iter().collect();
        let mut candidates = Vec::new();
        let mut anchor_windows_skipped = 0usize;

        for &reverse in &[false, true] {
            let (anchors_by_target, skipped) =
                propose_anchors(query, reverse, self.index, self.index.params(), self.config.max_qgrams);
            anchor_windows_skipped += skipped;

            let chains = match chain_targets(
                &anchors_by_target,
                self.config.match_score,
                self.config.max_gap,
                self.config.min_chain_length,
                self.config.max_chains,
            ) {
                Ok(chains) => chains,
                Err(e) => {
                    eprintln!("{MODULE} WARNING! query {query_id}: {e}; emitting placeholder");
                    return Some(QueryOutcome {
                        records: vec![AlignmentRecord::placeholder(query)],
                        anchor_windows_skipped,
                    });
                }
            };

            let mut chains_by_reference: HashMap<u64, Vec<_>, RandomState> = HashMap::default();
            for chain in chains {
                chains_by_reference.entry(chain.reference_id).or_default().push(chain);
            }

            for (reference_id, ref_chains) in chains_by_reference {
                let Some(reference) = self.store.ref_molecule(reference_id) else {
                    eprintln!("{MODULE} WARNING! query {query_id}: chain referenced unknown reference {reference_id}");
                    continue;
                };

                let regions = merge_regions(ref_chains, query, reference, self.config.chain_threshold, reverse);
                let target_labels = reference.labels();

                for region in regions {
                    let target_gaps: Vec<u32> =
                        target_labels[region.t_start_idx..=region.t_end_idx].windows(2).map(|w| w[1] - w[0]).collect();

                    match dtw::align(&query_gaps, &target_gaps, &self.config.dtw, reverse) {
                        Ok(result) => {
                            let qlen = query_gaps.len();
                            let (q_start_idx, q_end_idx) =
                                if reverse { (qlen - result.qend, qlen - result.qstart) } else { (result.qstart, result.qend) };
                            let t_start_idx = region.t_start_idx + result.tstart;
                            let t_end_idx = region.t_start_idx + result.tend;

                            candidates.push(AlignmentRecord {
                                query_id,
                                reference_id: Some(reference_id),
                                query_reverse: Some(reverse),
                                query_start_label_idx: Some(q_start_idx),
                                query_end_label_idx: Some(q_end_idx),
                                query_label_count: query.label_count(),
                                query_start_pos: Some(query.labels()[q_start_idx]),
                                query_end_pos: Some(query.labels()[q_end_idx]),
                                query_length_bp: query.length_bp(),
                                reference_start_label_idx: Some(t_start_idx),
                                reference_end_label_idx: Some(t_end_idx),
                                reference_label_count: Some(reference.label_count()),
                                reference_start_pos: Some(reference.labels()[t_start_idx]),
                                reference_end_pos: Some(reference.labels()[t_end_idx]),
                                reference_length_bp: Some(reference.length_bp()),
                                score: Some(result.score),
                                path: Some(path_to_string(&result.path)),
                            });
                        }
                        Err(_dtw_empty) => {
                            // Scored a hard -1 so it sorts to the bottom and
                            // never clears `dtw_threshold`; the query still
                            // proceeds rather than aborting.
                            candidates.push(AlignmentRecord {
                                query_id,
                                reference_id: Some(reference_id),
                                query_reverse: Some(reverse),
                                query_start_label_idx: None,
                                query_end_label_idx: None,
                                query_label_count: query.label_count(),
                                query_start_pos: None,
                                query_end_pos: None,
                                query_length_bp: query.length_bp(),
                                reference_start_label_idx: None,
                                reference_end_label_idx: None,
                                reference_label_count: Some(reference.label_count()),
                                reference_start_pos: None,
                                reference_end_pos: None,
                                reference_length_bp: Some(reference.length_bp()),
                                score: Some(-1.0),
                                path: None,
                            });
                        }
                    }
                }
            }
        }

        candidates.sort_unstable_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let selected: Vec<AlignmentRecord> = candidates
            .into_iter()
            .filter(|c| c.score.is_some_and(|s| s >= self.config.dtw_threshold))
            .take(self.config.max_alignments)
            .collect();

        if selected.is_empty() {
            Some(QueryOutcome { records: vec![AlignmentRecord::placeholder(query)], anchor_windows_skipped })
        } else {
            Some(QueryOutcome { records: selected, anchor_windows_skipped })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::invariant_index::InvariantIndex;

    fn build_store(ref_labels: Vec<u32>, query_labels: Vec<u32>) -> MapStore {
        let mut store = MapStore::new();
        let ref_len = *ref_labels.last().unwrap();
        let q_len = *query_labels.last().unwrap();
        store.insert_reference(Molecule::new(1, ref_len, ref_labels).unwrap());
        store.insert_query(Molecule::new(7, q_len, query_labels).unwrap());
        store
    }

    #[test]
    fn identity_query_produces_high_confidence_forward_alignment() {
        let positions =
            vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000];
        let store = build_store(positions.clone(), positions);
        let config = Config::default();
        let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
        let driver = AlignmentDriver::new(&store, &index, &config);

        let outcome = driver.align_query(7).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.reference_id, Some(1));
        assert_eq!(record.query_reverse, Some(false));
        assert!(record.score.unwrap() >= config.dtw_threshold);
        // 12 positions (11 real labels plus the terminal marker) means 11
        // inter-label gaps, so a full identity match traces 11 MATCH steps.
        assert_eq!(record.path.as_deref(), Some(".".repeat(11).as_str()));
    }

    #[test]
    fn query_below_min_labels_emits_placeholder() {
        let ref_positions = vec![0, 10000, 23000, 41000, 62000, 80000, 100000];
        let short_query = vec![0, 50000, 100000];
        let store = build_store(ref_positions, short_query);
        let config = Config::default();
        let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
        let driver = AlignmentDriver::new(&store, &index, &config);

        let outcome = driver.align_query(7).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].reference_id.is_none());
        assert_eq!(outcome.records[0].query_label_count, 2);
    }

    #[test]
    fn unrelated_query_yields_placeholder_when_nothing_clears_threshold() {
        let ref_positions = vec![0, 10000, 23000, 41000, 62000, 80000, 100000];
        let query_positions = vec![0, 1000, 1500, 2200, 3100, 4050, 5000, 5900, 6800, 7600, 8500, 9200];
        let store = build_store(ref_positions, query_positions);
        let config = Config::default();
        let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
        let driver = AlignmentDriver::new(&store, &index, &config);

        let outcome = driver.align_query(7).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert!(outcome.records[0].reference_id.is_none() || outcome.records[0].score.unwrap() >= config.dtw_threshold);
    }

    #[test]
    fn reverse_complement_query_is_flagged_reverse() {
        let forward = vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000];
        let length = *forward.last().unwrap();
        let mut reversed: Vec<u32> = forward.iter().rev().map(|&p| length - p).collect();
        reversed.sort_unstable();

        let store = build_store(forward, reversed);
        let config = Config::default();
        let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
        let driver = AlignmentDriver::new(&store, &index, &config);

        let outcome = driver.align_query(7).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.reference_id, Some(1));
        assert_eq!(record.query_reverse, Some(true));
        assert!(record.score.unwrap() >= config.dtw_threshold);
    }

    #[test]
    fn query_with_one_extra_label_still_aligns_with_an_insertion() {
        let ref_positions = vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000];
        // Same molecule, plus one spurious label between 41000 and 52000.
        let query_positions =
            vec![0, 8000, 16000, 23000, 31000, 41000, 46000, 52000, 62000, 71000, 80000, 91000, 100000];
        let store = build_store(ref_positions, query_positions);
        let config = Config::default();
        let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
        let driver = AlignmentDriver::new(&store, &index, &config);

        let outcome = driver.align_query(7).unwrap();
        assert_eq!(outcome.records.len(), 1);
        let record = &outcome.records[0];
        assert_eq!(record.reference_id, Some(1));
        assert!(record.score.unwrap() >= config.dtw_threshold);
        assert!(record.path.as_deref().is_some_and(|p| p.contains('I')));
    }

    #[test]
    fn query_prefers_the_reference_it_actually_matches() {
        let matching = vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000];
        let unrelated = vec![0, 1000, 1500, 2200, 3100, 4050, 5000, 5900, 6800, 7600, 8500, 9200];

        let mut store = MapStore::new();
        store.insert_reference(Molecule::new(1, *unrelated.last().unwrap(), unrelated).unwrap());
        store.insert_reference(Molecule::new(2, *matching.last().unwrap(), matching.clone()).unwrap());
        store.insert_query(Molecule::new(7, *matching.last().unwrap(), matching).unwrap());

        let config = Config::default();
        let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
        let driver = AlignmentDriver::new(&store, &index, &config);

        let outcome = driver.align_query(7).unwrap();
        assert_eq!(outcome.records[0].reference_id, Some(2));
    }
}
