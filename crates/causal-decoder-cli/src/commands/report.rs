//! `report` command: NDJSON test results on stdin, CSV on stdout.

use std::io::{self, BufWriter};

use causal_decoder_report::{process_stream, KeyLayout};
use clap::{Args, ValueEnum};
use tracing::{error, info};

/// Layout of the `fullName` key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// llm | suite | kind | test
    #[default]
    Suite,
    /// llm | type | test
    Type,
}

impl From<LayoutArg> for KeyLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Suite => KeyLayout::Suite,
            LayoutArg::Type => KeyLayout::Type,
        }
    }
}

/// Arguments for the report command.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Composite key layout
    #[arg(short, long, value_enum, default_value = "suite")]
    pub layout: LayoutArg,
}

/// Handle the report command.
pub fn handle_report_command(args: ReportArgs) -> i32 {
    let layout = KeyLayout::from(args.layout);
    let stdin = io::stdin().lock();
    let stdout = BufWriter::new(io::stdout().lock());

    match process_stream(stdin, stdout, layout) {
        Ok(summary) => {
            info!(
                layout = %layout,
                records = summary.records,
                passed = summary.passed,
                failed = summary.failed(),
                skipped_lines = summary.skipped_lines,
                "Report complete"
            );
            for (reason, count) in &summary.reasons {
                info!(reason = %reason, count, "Failure reason");
            }
            0
        }
        Err(e) => {
            error!("Report failed: {}", e);
            eprintln!("Error: {}", e);
            1
        }
    }
}
