//! Aligns optical-mapping molecules against a reference map via
//! geometric-invariant hashing, collinear chaining, and DTW refinement.
//!
//! The pipeline is [`map_store`] -> (build once) [`invariant_index`] ->
//! per query: [`anchorer`] -> [`chainer`] -> [`region_merger`] ->
//! [`dtw`], orchestrated per query by [`driver`]. [`align`] wires this
//! into the `align` CLI subcommand; [`io`] loads the tab-delimited
//! molecule map files that subcommand reads.

mod args;

pub mod align;
pub mod anchorer;
pub mod chainer;
pub mod config;
pub mod driver;
pub mod dtw;
pub mod error;
pub mod invariant_index;
pub mod map_store;
pub mod region_merger;

pub(crate) mod io;
pub(crate) mod utils;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aligns query molecules against a reference map.
    Align(align::AlignArgs),
}

impl Cli {
    /// Dispatches to the selected subcommand.
    pub fn run(self) -> std::io::Result<()> {
        match self.command {
            Commands::Align(args) => align::align_process(args),
        }
    }
}
