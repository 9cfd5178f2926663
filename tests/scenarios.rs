//! End-to-end coverage of the six worked scenarios from the core's
//! testable-properties section: identity match, reversed orientation,
//! a missed label, a spurious label, a below-threshold query, and an
//! ambiguous query that shares a prefix with two references.
//!
//! Label positions are scaled up from the originals so a query's label
//! count clears the default `min_labels` gate (11) without touching any
//! other default in `Config`; the missed/spurious-label edits and the
//! shared-prefix setup are otherwise exactly the scenarios describe.

use rmap_align::config::Config;
use rmap_align::driver::AlignmentDriver;
use rmap_align::invariant_index::InvariantIndex;
use rmap_align::map_store::{MapStore, Molecule};

fn molecule(id: u64, positions: Vec<u32>) -> Molecule {
    let length = *positions.last().unwrap();
    Molecule::new(id, length, positions).unwrap()
}

/// Scenario A: an unmodified molecule aligned against itself matches end
/// to end, in the forward orientation, entirely by MATCH steps.
#[test]
fn scenario_a_identity_match() {
    let positions =
        vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000, 110000];

    let mut store = MapStore::new();
    store.insert_reference(molecule(1, positions.clone()));
    store.insert_query(molecule(7, positions));

    let config = Config::default();
    let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
    let driver = AlignmentDriver::new(&store, &index, &config);

    let outcome = driver.align_query(7).unwrap();
    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.reference_id, Some(1));
    assert_eq!(record.query_reverse, Some(false));
    assert_eq!(record.query_start_label_idx, Some(0));
    assert!(record.score.unwrap() >= config.dtw_threshold);
    let path = record.path.as_deref().unwrap();
    assert!(path.chars().all(|c| c == '.'));
}

/// Scenario B: the same molecule presented with its labels reversed
/// (mirroring the gap sequence, terminal marker preserved) aligns with
/// the reverse flag set and a comparable score.
#[test]
fn scenario_b_reversed_query_flags_qrev() {
    let forward =
        vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000, 110000];
    let length = *forward.last().unwrap();
    let mut reversed: Vec<u32> = forward.iter().rev().map(|&p| length - p).collect();
    reversed.sort_unstable();

    let mut store = MapStore::new();
    store.insert_reference(molecule(1, forward));
    store.insert_query(molecule(7, reversed));

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

/// Scenario C: a query that is missing one interior label still aligns,
/// absorbing the gap as a single DEL step.
#[test]
fn scenario_c_missed_label_produces_one_del() {
    let reference =
        vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000, 110000];
    // Same molecule with the 52000 label dropped.
    let query = vec![0, 8000, 16000, 23000, 31000, 41000, 62000, 71000, 80000, 91000, 100000, 110000];

    let mut store = MapStore::new();
    store.insert_reference(molecule(1, reference));
    store.insert_query(molecule(7, query));

    let config = Config::default();
    let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
    let driver = AlignmentDriver::new(&store, &index, &config);

    let outcome = driver.align_query(7).unwrap();
    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.reference_id, Some(1));
    assert!(record.score.unwrap() >= config.dtw_threshold);
    let path = record.path.as_deref().unwrap();
    assert_eq!(path.chars().filter(|&c| c == 'D').count(), 1);
}

/// Scenario D: a query with one spurious extra label still aligns,
/// absorbing it as a single INS step.
#[test]
fn scenario_d_spurious_label_produces_one_ins() {
    let reference =
        vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000, 110000];
    // Same molecule plus one spurious label between 41000 and 52000.
    let query =
        vec![0, 8000, 16000, 23000, 31000, 41000, 46000, 52000, 62000, 71000, 80000, 91000, 100000, 110000];

    let mut store = MapStore::new();
    store.insert_reference(molecule(1, reference));
    store.insert_query(molecule(7, query));

    let config = Config::default();
    let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
    let driver = AlignmentDriver::new(&store, &index, &config);

    let outcome = driver.align_query(7).unwrap();
    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert_eq!(record.reference_id, Some(1));
    assert!(record.score.unwrap() >= config.dtw_threshold);
    let path = record.path.as_deref().unwrap();
    assert_eq!(path.chars().filter(|&c| c == 'I').count(), 1);
}

/// Scenario E: a query below `min_labels` never reaches chaining; the
/// driver emits a placeholder record instead.
#[test]
fn scenario_e_below_min_labels_emits_placeholder() {
    let reference = vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000, 71000, 80000, 91000, 100000];
    let short_query = vec![0, 50000, 110000];

    let mut store = MapStore::new();
    store.insert_reference(molecule(1, reference));
    store.insert_query(molecule(7, short_query));

    let config = Config::default();
    let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
    let driver = AlignmentDriver::new(&store, &index, &config);

    let outcome = driver.align_query(7).unwrap();
    assert_eq!(outcome.records.len(), 1);
    let record = &outcome.records[0];
    assert!(record.reference_id.is_none());
    assert!(record.path.is_none());
    assert_eq!(record.query_label_count, 2);
}

/// Scenario F: two references share a label prefix and diverge after it;
/// a query matching only the shared prefix yields a ranked, bounded,
/// score-descending set of candidate hits rather than a single forced
/// pick.
#[test]
fn scenario_f_ambiguous_prefix_ranks_candidates() {
    let shared_prefix = vec![0, 8000, 16000, 23000, 31000, 41000, 52000, 62000];

    let mut ref_a = shared_prefix.clone();
    ref_a.extend([80000, 95000, 130000]);
    let mut ref_b = shared_prefix.clone();
    ref_b.extend([77000, 101000, 125000]);

    let mut query = shared_prefix.clone();
    query.extend([63500, 64700, 65900, 67200, 68600, 140000]);

    let mut store = MapStore::new();
    store.insert_reference(molecule(1, ref_a));
    store.insert_reference(molecule(2, ref_b));
    store.insert_query(molecule(7, query));

    let config = Config::default();
    let index = InvariantIndex::build(&store, config.invariant_index, config.resolution_min);
    let driver = AlignmentDriver::new(&store, &index, &config);

    let outcome = driver.align_query(7).unwrap();
    assert!(outcome.records.len() <= config.max_alignments);
    assert!(outcome.records.windows(2).all(|w| w[0].score.unwrap_or(f64::MIN) >= w[1].score.unwrap_or(f64::MIN)));
    for record in &outcome.records {
        if let (Some(path), Some(qs), Some(qe), Some(ts), Some(te)) =
            (&record.path, record.query_start_label_idx, record.query_end_label_idx, record.reference_start_label_idx, record.reference_end_label_idx)
        {
            let match_or_ins = path.chars().filter(|&c| c == '.' || c == 'I').count();
            let match_or_del = path.chars().filter(|&c| c == '.' || c == 'D').count();
            assert_eq!(match_or_ins, qe - qs);
            assert_eq!(match_or_del, te - ts);
        }
    }
}
