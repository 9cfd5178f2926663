//! Loads the two tab-delimited molecule map files (reference and query)
//! into a [`MapStore`]. Deliberately thin and separately testable from
//! the alignment pipeline: the core only ever sees an already-populated
//! `MapStore`, and parsing is kept out of its way.
//!
//! One non-blank, non-header line per molecule: `id`, a tab, `length_bp`,
//! a tab, then its label positions separated by commas or whitespace,
//! ascending, with the terminal marker (equal to `length_bp`) included as
//! the last value. A line beginning with `#` is a header: its
//! whitespace-separated fields after the `#` are collected as
//! recognition-site strings and passed straight through, uninterpreted,
//! for the caller to echo into an output header if it wants one.

use std::io::BufRead;
use std::path::Path;

use crate::io::{finalize_io_thread, open_text_file};
use crate::map_store::Molecule;

/// The molecules and header strings recovered from one map file.
#[derive(Debug, Default)]
pub struct LoadedMap {
    pub molecules: Vec<Molecule>,
    pub recognition_sites: Vec<String>,
    /// Number of non-blank, non-header lines that failed to parse or
    /// violated a [`Molecule`] invariant and were skipped: the offending
    /// molecule is dropped and the rest of the file is still processed.
    pub skipped: usize,
}

/// Loads one molecule map file, decompressing transparently if `path` ends
/// in `.gz`.
pub fn load_map_file<P: AsRef<Path>>(path: P) -> std::io::Result<LoadedMap> {
    let (reader, thread) = open_text_file(&path)?;
    let mut loaded = LoadedMap::default();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        if let Some(header) = line.strip_prefix('#') {
            loaded.recognition_sites.extend(header.split_whitespace().map(str::to_owned));
            continue;
        }
        match parse_molecule_line(line) {
            Some(molecule) => loaded.molecules.push(molecule),
            None => loaded.skipped += 1,
        }
    }

    finalize_io_thread(thread)?;
    Ok(loaded)
}

fn parse_molecule_line(line: &str) -> Option<Molecule> {
    let mut fields = line.split('\t');
    let id: u64 = fields.next()?.trim().parse().ok()?;
    let length_bp: u32 = fields.next()?.trim().parse().ok()?;
    let positions_field = fields.next()?;

    let labels: Vec<u32> = positions_field
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse::<u32>)
        .collect::<Result<_, _>>()
        .ok()?;

    Molecule::new(id, length_bp, labels).ok()
}
