//! Query-to-listing similarity.

use crate::normalize::normalize_text;

/// Similarity between a query and a listing label in `0..=100`.
///
/// Both sides go through [`normalize_text`] first, then the score is the
/// normalized Levenshtein similarity (`1 - distance / max_len`) scaled to a
/// percentage and rounded. Identical normalized strings score 100; strings
/// with no character in common at any aligned position score 0.
#[must_use]
pub fn fuzzy_score(query: &str, candidate: &str) -> u8 {
    let query = normalize_text(query);
    let candidate = normalize_text(candidate);
    let similarity = strsim::normalized_levenshtein(&query, &candidate);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (similarity * 100.0).round().clamp(0.0, 100.0) as u8;
    score
}
