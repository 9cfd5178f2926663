//! Overlap (glocal) dynamic time warping between a query's gap sequence
//! and a candidate target gap sequence.
//!
//! Ported numerically from the original tool's `dtw()`: the first row and
//! column are initialized to zero so the alignment can start anywhere
//! without penalty, the DP fills forward preferring MATCH over INS over
//! DEL on ties, and the best alignment ends at the maximum-scoring cell of
//! the last row or last column (row checked first, so a tie prefers
//! ending in the last row).

use crate::config::DtwParams;
use crate::error::{Error, Result};

/// One step of a traced-back alignment path, in start-to-end order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtwStep {
    Match,
    Ins,
    Del,
}

/// The outcome of aligning one query gap sequence against one target gap
/// sequence. Indices are into the gap arrays passed to [`align`], with
/// `qend`/`tend` inclusive of the end of the alignment (they mark the
/// DP cell the traceback started from, not one past it).
#[derive(Debug, Clone, PartialEq)]
pub struct DtwResult {
    pub score: f64,
    pub qstart: usize,
    pub qend: usize,
    pub tstart: usize,
    pub tend: usize,
    pub path: Vec<DtwStep>,
    pub reverse: bool,
}

/// Per-cell similarity of two gap sizes: 1.0 for an exact match, falling
/// linearly to 0.0 at `neutral_deviation` and to -1.0 at twice that,
/// either as an absolute bp tolerance (`neutral_deviation >= 1.0`) or as a
/// fraction of the target gap (`neutral_deviation < 1.0`).
fn score(a: u32, b: u32, neutral_deviation: f64) -> f64 {
    let diff = (a as f64 - b as f64).abs();
    if neutral_deviation >= 1.0 {
        1.0 - diff / neutral_deviation
    } else {
        1.0 - diff / b as f64 / neutral_deviation
    }
}

/// Aligns `query` against `target`, optionally walking the query in
/// reverse (reverse-orientation handling). Returns [`Error::DtwEmpty`] if
/// either sequence is empty.
pub fn align(query: &[u32], target: &[u32], params: &DtwParams, reverse: bool) -> Result<DtwResult> {
    let qlen = query.len();
    let tlen = target.len();
    if qlen == 0 || tlen == 0 {
        return Err(Error::DtwEmpty);
    }

    let rows = qlen + 1;
    let cols = tlen + 1;
    let mut score_matrix = vec![vec![0.0f64; cols]; rows];
    let mut direction = vec![vec![DtwStep::Match; cols]; rows];
    // Accumulated size of fragments folded into a prior INS/DEL run, reset
    // to zero whenever a MATCH is taken. Lets a later match "catch up" on
    // leftover size from a skipped label, per the qmatch/tmatch/qtmatch
    // bonuses below.
    let mut q_cum = vec![vec![0u32; cols]; rows];
    let mut t_cum = vec![vec![0u32; cols]; rows];

    for y in 0..qlen {
        let qy = if reverse { qlen - 1 - y } else { y };
        for x in 0..tlen {
            let qv = query[qy];
            let tv = target[x];
            let qc = q_cum[y][x];
            let tc = t_cum[y][x];

            let plain = score(qv, tv, params.neutral_deviation);
            let qmatch = score(qc + qv, tv, params.neutral_deviation) + params.qmatch_bonus;
            let tmatch = score(qv, tc + tv, params.neutral_deviation) + params.tmatch_bonus;
            let qtmatch = score(qc + qv, tc + tv, params.neutral_deviation) + params.qtmatch_bonus;

            let match_val = if plain > qmatch && plain > tmatch && plain > qtmatch {
                plain
            } else if qtmatch > qmatch && qtmatch > tmatch {
                qtmatch
            } else if qmatch > tmatch {
                qmatch
            } else {
                tmatch
            };

            let ins = score_matrix[y][x + 1] + params.ins_score;
            let del = score_matrix[y + 1][x] + params.del_score;

            if match_val >= ins && match_val >= del {
                score_matrix[y + 1][x + 1] = match_val;
                direction[y + 1][x + 1] = DtwStep::Match;
                q_cum[y + 1][x + 1] = 0;
                t_cum[y + 1][x + 1] = 0;
            } else if ins >= del {
                score_matrix[y + 1][x + 1] = ins;
                direction[y + 1][x + 1] = DtwStep::Ins;
                q_cum[y + 1][x + 1] = q_cum[y][x + 1] + qv;
                t_cum[y + 1][x + 1] = t_cum[y][x + 1];
            } else {
                score_matrix[y + 1][x + 1] = del;
                direction[y + 1][x + 1] = DtwStep::Del;
                t_cum[y + 1][x + 1] = t_cum[y + 1][x] + tv;
                q_cum[y + 1][x + 1] = q_cum[y + 1][x];
            }
        }
    }

    // Seed with the first last-row cell rather than (0, 0): every cell in
    // the last row/column can be negative (e.g. a single badly-mismatched
    // pair), and (0, 0)'s score of 0.0 would otherwise win by default even
    // though it isn't a valid overlap-alignment terminus for qlen,tlen > 0.
    let mut max_y = qlen;
    let mut max_x = 1;
    for x in 2..=tlen {
        if score_matrix[qlen][x] > score_matrix[max_y][max_x] {
            max_x = x;
            max_y = qlen;
        }
    }
    for y in 1..=qlen {
        if score_matrix[y][tlen] > score_matrix[max_y][max_x] {
            max_x = tlen;
            max_y = y;
        }
    }

    let mut path = Vec::new();
    let (mut x, mut y) = (max_x, max_y);
    while y > 0 && x > 0 {
        let step = direction[y][x];
        path.push(step);
        match step {
            DtwStep::Match => {
                x -= 1;
                y -= 1;
            }
            DtwStep::Ins => y -= 1,
            DtwStep::Del => x -= 1,
        }
    }
    path.reverse();

    Ok(DtwResult { score: score_matrix[max_y][max_x], qstart: y, qend: max_y, tstart: x, tend: max_x, path, reverse })
}
