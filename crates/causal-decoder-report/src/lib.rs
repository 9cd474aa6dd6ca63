//! Failure classification for causal-decoder evaluation runs.
//!
//! Reads the newline-delimited JSON emitted by the evaluation test runner
//! and turns every record into one CSV row with a failure reason drawn from
//! a fixed taxonomy.
//!
//! ```text
//! NDJSON line → TestResultRecord → TestKey + consolidated FailureReason → CSV row
//! ```
//!
//! A record's failures must agree: if their messages map to different
//! reasons the row reads `Multiple Kinds of Failures`.

pub mod classify;
pub mod csv;
pub mod error;
pub mod record;
pub mod stream;
pub mod taxonomy;

// Re-exports
pub use classify::{classify, consolidate, ClassifiedRow};
pub use error::{ReportError, ReportResult};
pub use record::{FailedExpectation, KeyLayout, TestKey, TestResultRecord};
pub use stream::{process_stream, ReportSummary};
pub use taxonomy::{reason_for_message, FailureReason, TAXONOMY};
