//! Failure reason taxonomy.

use std::fmt;

use serde::Serialize;

/// Category assigned to a failed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureReason {
    Polarity,
    MissingRelationship,
    FakeRelationship,
    MissingRequiredVariables,
    TooManyVariables,
    TooFewVariables,
    TooManyFeedbackLoops,
    TooFewFeedbackLoops,
    /// No taxonomy prefix matched, or there were no messages to inspect.
    Unknown,
    /// The failures of one record fell into different categories.
    Multiple,
}

impl FailureReason {
    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Polarity => "Polarity",
            Self::MissingRelationship => "Missing relationship",
            Self::FakeRelationship => "Fake relationship",
            Self::MissingRequiredVariables => "Missing required variables",
            Self::TooManyVariables => "Too many variables",
            Self::TooFewVariables => "Too few variables",
            Self::TooManyFeedbackLoops => "Too many feedback loops",
            Self::TooFewFeedbackLoops => "Too few feedback loops",
            Self::Unknown => "Unknown",
            Self::Multiple => "Multiple Kinds of Failures",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Message prefixes in match order. The first prefix that matches wins.
pub const TAXONOMY: &[(&str, FailureReason)] = &[
    ("Incorrect polarity discovered", FailureReason::Polarity),
    ("Real relationships not found", FailureReason::MissingRelationship),
    ("Fake relationships found", FailureReason::FakeRelationship),
    ("Missing required variables", FailureReason::MissingRequiredVariables),
    ("Too many variables", FailureReason::TooManyVariables),
    ("Too few variables", FailureReason::TooFewVariables),
    ("Too many feedback loops", FailureReason::TooManyFeedbackLoops),
    ("Too few feedback loops", FailureReason::TooFewFeedbackLoops),
];

/// Map one failure message to its reason. Matching is a case-sensitive
/// prefix test.
pub fn reason_for_message(message: &str) -> FailureReason {
    TAXONOMY
        .iter()
        .find(|(prefix, _)| message.starts_with(prefix))
        .map(|(_, reason)| *reason)
        .unwrap_or(FailureReason::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_prefix_maps_to_its_reason() {
        for (prefix, reason) in TAXONOMY {
            let message = format!("{prefix}: details follow");
            assert_eq!(reason_for_message(&message), *reason);
        }
    }

    #[test]
    fn test_polarity_example() {
        assert_eq!(
            reason_for_message("Incorrect polarity discovered for X"),
            FailureReason::Polarity
        );
    }

    #[test]
    fn test_unmatched_is_unknown() {
        assert_eq!(reason_for_message("Timeout after 30s"), FailureReason::Unknown);
        assert_eq!(reason_for_message(""), FailureReason::Unknown);
        // Prefix only, not substring, and case matters.
        assert_eq!(
            reason_for_message("Error: Too many variables"),
            FailureReason::Unknown
        );
        assert_eq!(
            reason_for_message("too many variables"),
            FailureReason::Unknown
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(FailureReason::MissingRelationship.label(), "Missing relationship");
        assert_eq!(FailureReason::Multiple.to_string(), "Multiple Kinds of Failures");
    }
}
