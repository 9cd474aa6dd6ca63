//! Parse `Source -> +Target` notation into relationships.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use crate::types::{Polarity, Relationship};

static SEGMENT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\n]+").expect("separator pattern is valid"));

static RELATIONSHIP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)->\s*([+-])\s*(.+)$").expect("relationship pattern is valid"));

/// Split `text` on commas, semicolons and newlines and parse each segment.
///
/// Segments that do not match the notation, or whose source or target is
/// blank after trimming, are skipped. The source is everything before the
/// first `->`; the target may itself contain arrows.
pub fn parse_relationships(text: &str) -> Vec<Relationship> {
    SEGMENT_SEPARATOR
        .split(text)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(parse_segment)
        .collect()
}

fn parse_segment(segment: &str) -> Option<Relationship> {
    let Some(caps) = RELATIONSHIP.captures(segment) else {
        trace!(segment, "Skipping non-relationship segment");
        return None;
    };

    let polarity = caps
        .get(2)
        .and_then(|m| m.as_str().chars().next())
        .and_then(Polarity::from_sign)?;
    let from = caps.get(1)?.as_str().trim();
    let to = caps.get(3)?.as_str().trim();

    if from.is_empty() || to.is_empty() {
        trace!(segment, "Skipping segment with blank endpoint");
        return None;
    }

    Some(Relationship::new(from, polarity, to))
}
