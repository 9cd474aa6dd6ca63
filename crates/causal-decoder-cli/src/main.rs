//! causal-decoder command-line tool
//!
//! # Usage
//!
//! ```bash
//! # Extract relationships from a paragraph (JSON on stdout)
//! causal-decoder extract "Heavy rain raises the river level."
//!
//! # Beam search with the long-beam preset on CPU
//! causal-decoder extract --preset long-beam --cpu "..."
//!
//! # Classify evaluation output into CSV
//! npm test --silent | causal-decoder report > failures.csv
//!
//! # Debug logging (stderr)
//! CAUSAL_DECODER_LOG=debug causal-decoder extract "..."
//! ```
//!
//! Settings come from `config/default.toml`, then `--config`, then
//! `CAUSAL_DECODER__*` environment variables, then flags.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use causal_decoder::DecoderConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use commands::extract::{handle_extract_command, ExtractArgs};
use commands::report::{handle_report_command, ReportArgs};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "CAUSAL_DECODER_LOG";

#[derive(Parser)]
#[command(
    name = "causal-decoder",
    version,
    about = "Causal relationship extraction with a local LLM"
)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract causal relationships from a paragraph
    Extract(ExtractArgs),

    /// Turn NDJSON test results on stdin into a CSV failure report
    Report(ReportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only extraction needs the decoder configuration.
    let config = match cli.command {
        Commands::Extract(_) => Some(DecoderConfig::load(cli.config.as_deref())),
        Commands::Report(_) => None,
    };

    let level = config
        .as_ref()
        .and_then(|c| c.as_ref().ok())
        .map(|c| c.logging.level.as_str())
        .unwrap_or("info");
    init_tracing(level);

    let code = match cli.command {
        Commands::Extract(args) => {
            let config = config.unwrap_or_else(|| DecoderConfig::load(cli.config.as_deref()));
            handle_extract_command(args, config)
        }
        Commands::Report(args) => handle_report_command(args),
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Logs go to stderr: stdout carries JSON or CSV.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_without_paragraph_parses() {
        let cli = Cli::try_parse_from(["causal-decoder", "extract"]).unwrap();
        match cli.command {
            Commands::Extract(args) => assert!(args.paragraph.is_none()),
            Commands::Report(_) => panic!("expected extract"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli =
            Cli::try_parse_from(["causal-decoder", "report", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
    }
}
