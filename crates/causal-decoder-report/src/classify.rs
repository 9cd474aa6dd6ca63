//! Per-record classification.

use serde::Serialize;

use crate::error::ReportResult;
use crate::record::{strip_field, KeyLayout, TestKey, TestResultRecord};
use crate::taxonomy::{reason_for_message, FailureReason};

/// Status value that marks a test as passing.
pub const PASSED: &str = "passed";

/// One output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedRow {
    pub key: TestKey,
    pub status: String,
    /// `None` for passing tests.
    pub reason: Option<FailureReason>,
}

impl ClassifiedRow {
    /// Reason label, empty for passing tests.
    pub fn reason_label(&self) -> &'static str {
        self.reason.map(|r| r.label()).unwrap_or("")
    }
}

/// Fold per-failure reasons into one.
///
/// No reasons gives `Unknown`, identical reasons give that reason, anything
/// else gives `Multiple`.
pub fn consolidate<I>(reasons: I) -> FailureReason
where
    I: IntoIterator<Item = FailureReason>,
{
    let mut reasons = reasons.into_iter();
    let Some(first) = reasons.next() else {
        return FailureReason::Unknown;
    };
    if reasons.all(|r| r == first) {
        first
    } else {
        FailureReason::Multiple
    }
}

/// Classify a single record.
///
/// Pure; errors carry line 0 until the caller attaches a position.
pub fn classify(record: &TestResultRecord, layout: KeyLayout) -> ReportResult<ClassifiedRow> {
    let key = TestKey::parse(&record.full_name, layout)?;

    let reason = if record.status == PASSED {
        None
    } else {
        Some(consolidate(
            record
                .failed_expectations
                .iter()
                .map(|f| reason_for_message(&f.message)),
        ))
    };

    Ok(ClassifiedRow {
        key,
        status: strip_field(&record.status).to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FailedExpectation;

    fn record(status: &str, messages: &[&str]) -> TestResultRecord {
        TestResultRecord {
            full_name: "gpt-4o|Basic|Simple|rain".to_string(),
            status: status.to_string(),
            failed_expectations: messages
                .iter()
                .map(|m| FailedExpectation {
                    message: m.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_passed_has_empty_reason_even_with_failures() {
        let row = classify(&record("passed", &["Too many variables"]), KeyLayout::Suite).unwrap();
        assert_eq!(row.reason, None);
        assert_eq!(row.reason_label(), "");
    }

    #[test]
    fn test_uniform_failures() {
        let row = classify(
            &record(
                "failed",
                &["Fake relationships found: A->B", "Fake relationships found: C->D"],
            ),
            KeyLayout::Suite,
        )
        .unwrap();
        assert_eq!(row.reason, Some(FailureReason::FakeRelationship));
    }

    #[test]
    fn test_mixed_failures() {
        let row = classify(
            &record("failed", &["Too many variables", "Too few feedback loops"]),
            KeyLayout::Suite,
        )
        .unwrap();
        assert_eq!(row.reason_label(), "Multiple Kinds of Failures");
    }

    #[test]
    fn test_unknown_mixed_with_known_is_multiple() {
        assert_eq!(
            consolidate([FailureReason::Unknown, FailureReason::Polarity]),
            FailureReason::Multiple
        );
    }

    #[test]
    fn test_failed_without_messages_is_unknown() {
        let row = classify(&record("failed", &[]), KeyLayout::Suite).unwrap();
        assert_eq!(row.reason, Some(FailureReason::Unknown));
    }

    #[test]
    fn test_non_passed_status_is_classified() {
        // Only the exact "passed" status counts as passing.
        let row = classify(&record("pending", &["Too few variables"]), KeyLayout::Suite).unwrap();
        assert_eq!(row.reason, Some(FailureReason::TooFewVariables));
    }

    #[test]
    fn test_layout_mismatch_is_error() {
        assert!(classify(&record("failed", &[]), KeyLayout::Type).is_err());
    }
}
