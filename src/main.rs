//! midimerge - Merges a format 1 MIDI file into a format 0 file.
//!
//! Every track of the input is flattened onto one timeline. Absolute event
//! times are kept, only the first track name survives, and a single
//! end-of-track marker closes the output.
//!
//! # Usage
//!
//! ```bash
//! midimerge input.mid output.mid
//! RUST_LOG=debug midimerge input.mid output.mid   # show per-track details
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Command-line options for the application.
struct CliOptions {
    /// Format 1 file to read.
    input: PathBuf,
    /// Destination of the format 0 file.
    output: PathBuf,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Exactly two positional arguments are accepted. Anything else prints
    /// the usage line and exits with status 1.
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        if args.len() != 3 {
            let program = args.first().map(String::as_str).unwrap_or("midimerge");
            eprintln!("Usage: {} input.mid output.mid", program);
            eprintln!();
            std::process::exit(1);
        }

        Self {
            input: PathBuf::from(&args[1]),
            output: PathBuf::from(&args[2]),
        }
    }
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let summary = midimerge::merge_file(&cli.input, &cli.output).with_context(|| {
        format!(
            "Failed to merge {} into {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;

    tracing::debug!("Merge summary: {:?}", summary);
    Ok(())
}
