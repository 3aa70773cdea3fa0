//! Renders a binary IP set file as a Graphviz graph.
//!
//! Run with:
//! ```bash
//! cargo run --example ipsetdot -- --input blocked.ips | dot -Tpng -o blocked.png
//! ```

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use ipset_rs::set::IpSet;
use ipset_rs::store::NodeStore;
use log::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Render a binary IP set as a DOT graph")]
struct Cli {
    /// Input file (stdin if omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    let cli = Cli::parse();

    let input: Box<dyn Read> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let store = NodeStore::new();
    let set = IpSet::load(&store, input)?;
    info!("store = {:?}", store);
    let dot = set.to_dot()?;

    match &cli.output {
        Some(path) => {
            info!("Writing to file {}...", path.display());
            std::fs::write(path, dot)?;
        }
        None => {
            io::stdout().write_all(dot.as_bytes())?;
        }
    }

    Ok(())
}
