//! Line-oriented processing of reporter output.

use std::io::{BufRead, Write};

use serde::Serialize;
use tracing::{debug, trace};

use crate::classify::classify;
use crate::csv::{format_row, header};
use crate::error::{ReportError, ReportResult};
use crate::record::{KeyLayout, TestResultRecord};
use crate::taxonomy::FailureReason;

/// Counts gathered while processing a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// JSON records classified.
    pub records: usize,
    /// Lines ignored because they did not start with `{`.
    pub skipped_lines: usize,
    pub passed: usize,
    /// Failure reasons in first-seen order.
    pub reasons: Vec<(FailureReason, usize)>,
}

impl ReportSummary {
    pub fn failed(&self) -> usize {
        self.records - self.passed
    }

    fn tally(&mut self, reason: Option<FailureReason>) {
        self.records += 1;
        let Some(reason) = reason else {
            self.passed += 1;
            return;
        };
        match self.reasons.iter_mut().find(|(r, _)| *r == reason) {
            Some((_, count)) => *count += 1,
            None => self.reasons.push((reason, 1)),
        }
    }
}

/// Write the header, then one CSV row per JSON record line, in input order.
///
/// Lines that do not start with `{` are skipped. The first undecodable
/// record or malformed key stops processing with an error naming its
/// 1-based line.
pub fn process_stream<R, W>(
    reader: R,
    mut writer: W,
    layout: KeyLayout,
) -> ReportResult<ReportSummary>
where
    R: BufRead,
    W: Write,
{
    writeln!(writer, "{}", header(layout))?;

    let mut summary = ReportSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        if !line.starts_with('{') {
            trace!(line = line_no, "Skipping non-record line");
            summary.skipped_lines += 1;
            continue;
        }

        let record: TestResultRecord =
            serde_json::from_str(&line).map_err(|e| ReportError::InvalidRecord {
                line: line_no,
                message: e.to_string(),
            })?;

        let row = classify(&record, layout).map_err(|e| e.at_line(line_no))?;
        writeln!(writer, "{}", format_row(&row))?;
        summary.tally(row.reason);
    }

    writer.flush()?;

    debug!(
        records = summary.records,
        skipped = summary.skipped_lines,
        passed = summary.passed,
        "Processed test report stream"
    );
    Ok(summary)
}
