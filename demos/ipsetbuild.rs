//! Builds a binary IP set file from text files of addresses and networks.
//!
//! One address or CIDR network per line. Blank lines and lines starting with
//! `#` are ignored. A line starting with `!` removes the address or network
//! once every addition of that file has been applied. Malformed lines,
//! duplicates and removals of absent addresses are reported as warnings.
//!
//! Run with:
//! ```bash
//! cargo run --example ipsetbuild -- --output blocked.ips blocked.txt
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use ipset_rs::address::Family;
use ipset_rs::set::IpSet;
use ipset_rs::store::NodeStore;
use log::info;

#[derive(Debug, Parser)]
#[command(author, version, about = "Build a binary IP set from text input")]
struct Cli {
    /// Input files, `-` for stdin
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log each node operation
    #[arg(short, long)]
    verbose: bool,
}

fn open(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path.as_os_str() == "-" {
        info!("Opening stdin...");
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        info!("Opening file {}...", path.display());
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let store = NodeStore::new();
    let mut set = IpSet::new(&store);

    for path in &cli.inputs {
        let summary = set.read_text(open(path)?, &path.display().to_string())?;
        info!("Read {} IP address records from {}.", summary.records, path.display());
        for family in Family::ALL {
            let blocks = summary.blocks(family);
            info!(
                "  {}: {} addresses, {} block{}",
                family,
                summary.addresses(family),
                blocks,
                if blocks == 1 { "" } else { "s" }
            );
        }
    }

    info!("Set holds {} addresses.", set.num_addresses());
    info!("Set uses {} bytes of memory.", set.memory_size());

    match &cli.output {
        Some(path) => {
            info!("Writing to file {}...", path.display());
            set.save(BufWriter::new(File::create(path)?))?;
        }
        None => {
            info!("Writing to stdout...");
            let stdout = io::stdout();
            let mut out = stdout.lock();
            set.save(&mut out)?;
            out.flush()?;
        }
    }

    Ok(())
}
