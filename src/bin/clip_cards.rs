// src/bin/clip_cards.rs
//! Converts a clip-capture JSON file into a tab-delimited flashcard import

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use clipboard_capture::cards::{convert_file, default_output_path};

#[derive(Debug, Parser)]
#[command(
    name = "clip-cards",
    about = "Turn a capture file into tab-delimited flashcards (front, back, tag)"
)]
struct Args {
    /// Capture file written by clip-capture
    input: PathBuf,

    /// Output path (default: <input>.txt)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbosity level for logging (logs go to stderr)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if args.verbose > 0 { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    convert_file(&args.input, &output)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    println!("Tab-delimited file for import created at {}.", output.display());
    Ok(())
}
