//! Strip chatter from raw model output, keeping only relationship-shaped
//! chunks.

use once_cell::sync::Lazy;
use regex::Regex;

/// A comma-free run that contains `->`, a polarity sign and a target.
static RELATIONSHIP_CHUNK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^,\s][^,]*->\s*[+-]\s*[^,\s][^,]*")
        .expect("relationship chunk pattern is valid")
});

/// Keep only the relationship-shaped chunks of `raw`, joined by `", "`.
///
/// Returns `raw` unchanged when nothing matches, so the parser still gets a
/// chance at unusual output. Applying the function twice gives the same
/// result as applying it once.
pub fn sanitize(raw: &str) -> String {
    let chunks: Vec<&str> = RELATIONSHIP_CHUNK
        .find_iter(raw)
        .map(|m| m.as_str().trim())
        .filter(|chunk| !chunk.is_empty())
        .collect();

    if chunks.is_empty() {
        raw.to_string()
    } else {
        chunks.join(", ")
    }
}
