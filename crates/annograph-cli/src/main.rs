//! Annograph CLI
//!
//! Unified command-line interface for:
//! - Converting structured JSON graph files to Penman notation (and back)
//! - Checking that interchange files parse cleanly
//! - Canonically re-rendering Penman files

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod check;
mod convert;
mod fmt;

#[derive(Parser)]
#[command(name = "annograph")]
#[command(
    author,
    version,
    about = "Annotation graphs with Penman-style interchange"
)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. `info` or `annograph_penman=debug`
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert structured JSON graph files to Penman notation
    ToPenman {
        /// Input JSON file, or a directory of `*.json` files
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory (defaults to the input's)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Print unreferenced attribute values bare (AMR-compatible output)
        #[arg(long)]
        amr: bool,
    },

    /// Convert Penman files to the structured JSON format
    ToJson {
        /// Input Penman file, or a directory of `*.penman` files
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory (defaults to the input's)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Parse interchange files and report malformed ones
    Check {
        /// Penman or JSON file, or a directory of them
        input: PathBuf,
    },

    /// Canonically re-render a Penman file
    Fmt {
        /// Input Penman file
        input: PathBuf,
        /// Write the rendering here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Rewrite the input file in place
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log.as_deref());

    match cli.command {
        Commands::ToPenman { input, out, amr } => {
            convert::cmd_to_penman(&input, out.as_deref(), amr)
        }
        Commands::ToJson { input, out } => convert::cmd_to_json(&input, out.as_deref()),
        Commands::Check { input } => check::cmd_check(&input),
        Commands::Fmt { input, out, write } => fmt::cmd_fmt(&input, out.as_deref(), write),
    }
}

fn init_tracing(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
