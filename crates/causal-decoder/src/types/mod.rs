//! Type definitions for extracted causal relationships.
//!
//! A relationship is a `(from, polarity, to)` triple read out of the
//! model's `Source -> +Target` notation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sign of a causal link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Source and target move in the same direction.
    #[serde(rename = "+")]
    Positive,

    /// Source and target move in opposite directions.
    #[serde(rename = "-")]
    Negative,
}

impl Polarity {
    /// Parse from the single polarity character used in model output.
    pub fn from_sign(sign: char) -> Option<Self> {
        match sign {
            '+' => Some(Self::Positive),
            '-' => Some(Self::Negative),
            _ => None,
        }
    }

    /// The polarity character.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "+",
            Self::Negative => "-",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Polarity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_sign(c).ok_or_else(|| format!("unknown polarity: {s}")),
            _ => Err(format!("unknown polarity: {s}")),
        }
    }
}

/// A single extracted causal relationship.
///
/// `from` and `to` are trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Cause variable.
    pub from: String,

    /// Effect variable.
    pub to: String,

    /// Link sign.
    pub polarity: Polarity,
}

impl Relationship {
    /// Create a relationship, trimming both endpoints.
    pub fn new(from: impl AsRef<str>, polarity: Polarity, to: impl AsRef<str>) -> Self {
        Self {
            from: from.as_ref().trim().to_string(),
            to: to.as_ref().trim().to_string(),
            polarity,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}{}", self.from, self.polarity, self.to)
    }
}

/// Outcome of one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Decoded continuation exactly as generated (trimmed).
    pub raw: String,

    /// Sanitized text handed to the parser. Equal to `raw` when
    /// sanitization is disabled or found nothing to keep.
    pub cleaned: String,

    /// Parsed relationships in emission order.
    pub relationships: Vec<Relationship>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_parsing() {
        assert_eq!(Polarity::from_sign('+'), Some(Polarity::Positive));
        assert_eq!(Polarity::from_sign('-'), Some(Polarity::Negative));
        assert_eq!(Polarity::from_sign('*'), None);
        assert_eq!("-".parse::<Polarity>(), Ok(Polarity::Negative));
        assert!("+-".parse::<Polarity>().is_err());
    }

    #[test]
    fn test_relationship_serializes_with_sign() {
        let rel = Relationship::new(" Rain ", Polarity::Positive, "Flood ");
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"from": "Rain", "to": "Flood", "polarity": "+"})
        );
        assert_eq!(rel.to_string(), "Rain -> +Flood");
    }
}
