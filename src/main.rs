use clap::Parser;
use rmap_align::Cli;

fn main() -> std::io::Result<()> {
    Cli::parse().run()
}
