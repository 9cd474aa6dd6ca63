//! Test-result records and their composite keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ReportResult};

/// One line of the test runner's JSON reporter output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestResultRecord {
    /// Pipe-delimited composite key, e.g. `gpt-4o | suite | kind | test`.
    #[serde(rename = "fullName")]
    pub full_name: String,

    pub status: String,

    #[serde(rename = "failedExpectations", default)]
    pub failed_expectations: Vec<FailedExpectation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FailedExpectation {
    pub message: String,
}

/// How `fullName` splits into fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyLayout {
    /// `llm | suite | kind | test`
    #[default]
    Suite,
    /// `llm | type | test`
    Type,
}

impl KeyLayout {
    pub fn field_count(&self) -> usize {
        match self {
            Self::Suite => 4,
            Self::Type => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suite => "suite",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for KeyLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suite" => Ok(Self::Suite),
            "type" => Ok(Self::Type),
            other => Err(format!("unknown key layout '{other}', expected suite or type")),
        }
    }
}

/// Decomposed `fullName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestKey {
    pub llm: String,
    /// Suite in the 4-field layout, type in the 3-field one.
    pub group: String,
    /// Only present in the 4-field layout.
    pub kind: Option<String>,
    pub test: String,
}

impl TestKey {
    /// Split `full_name` on `|` and strip each field.
    ///
    /// A field count other than the layout's is a `MalformedKey` error with
    /// line 0; stream processing fills in the real line.
    pub fn parse(full_name: &str, layout: KeyLayout) -> ReportResult<Self> {
        let fields: Vec<&str> = full_name.split('|').map(strip_field).collect();

        let key = match (layout, fields.as_slice()) {
            (KeyLayout::Suite, [llm, suite, kind, test]) => Self {
                llm: llm.to_string(),
                group: suite.to_string(),
                kind: Some(kind.to_string()),
                test: test.to_string(),
            },
            (KeyLayout::Type, [llm, kind, test]) => Self {
                llm: llm.to_string(),
                group: kind.to_string(),
                kind: None,
                test: test.to_string(),
            },
            _ => {
                return Err(ReportError::MalformedKey {
                    line: 0,
                    full_name: full_name.to_string(),
                    expected: layout.field_count(),
                    found: fields.len(),
                })
            }
        };
        Ok(key)
    }
}

/// Strip surrounding spaces and commas.
pub fn strip_field(field: &str) -> &str {
    field.trim_matches(|c| c == ' ' || c == ',')
}
