//! Prints the contents of a binary IP set file.
//!
//! Run with:
//! ```bash
//! cargo run --example ipsetcat -- --networks blocked.ips
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use ipset_rs::set::IpSet;
use ipset_rs::store::NodeStore;
use log::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Print the addresses in a binary IP set")]
struct Cli {
    /// Input file (stdin if omitted)
    input: Option<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print maximal CIDR blocks instead of individual addresses
    #[arg(short, long)]
    networks: bool,
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
        Some(path) => {
            info!("Opening file {}...", path.display());
            Box::new(BufReader::new(File::open(path)?))
        }
        None => {
            info!("Opening stdin...");
            Box::new(BufReader::new(io::stdin()))
        }
    };

    let store = NodeStore::new();
    let set = IpSet::load(&store, input)?;

    let mut output: Box<dyn Write> = match &cli.output {
        Some(path) => {
            info!("Writing to file {}...", path.display());
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => {
            info!("Writing to stdout...");
            Box::new(BufWriter::new(io::stdout()))
        }
    };

    let cursor = if cli.networks { set.iter_networks(true) } else { set.iter(true) };
    for block in cursor {
        writeln!(output, "{}", block.network)?;
    }
    output.flush()?;

    Ok(())
}
