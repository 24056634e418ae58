//! Reduction of scored candidates to a low/high price estimate.

use panier_core::{Candidate, Estimate};

use crate::score::fuzzy_score;

/// Listings considered per search.
pub const MAX_CANDIDATES: usize = 5;

/// Best-scored listings kept for pricing.
pub const TOP_BY_SCORE: usize = 3;

/// How a retailer maps the price-sorted best candidates onto the
/// `highest`/`lowest` fields.
///
/// Both conventions are in use across retailers and each must be kept as-is
/// so results stay comparable with earlier runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePairing {
    /// `highest` = most expensive of the best three, `lowest` = cheapest.
    HighestLast,
    /// `highest` = cheapest of the best three, `lowest` = most expensive.
    HighestFirst,
}

/// Label a candidate is scored under: name and brand, brand omitted when empty.
#[must_use]
pub fn candidate_label(candidate: &Candidate) -> String {
    format!("{} {}", candidate.name.trim(), candidate.brand.trim())
        .trim()
        .to_owned()
}

/// Turns the candidates of one search into an [`Estimate`].
///
/// Candidates without a score are scored against `query` first. Only the
/// first [`MAX_CANDIDATES`] are looked at; of those the [`TOP_BY_SCORE`] best
/// (ties keep listing order) are sorted by price and paired per `pairing`.
/// No candidates is a not-found estimate.
#[must_use]
pub fn reduce(query: &str, candidates: Vec<Candidate>, pairing: PricePairing) -> Estimate {
    let mut scored: Vec<Candidate> = candidates
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|c| match c.score {
            Some(_) => c,
            None => {
                let score = fuzzy_score(query, &candidate_label(&c));
                c.with_score(score)
            }
        })
        .collect();

    // `sort_by` is stable, which keeps listing order among equal scores.
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(TOP_BY_SCORE);
    scored.sort_by(|a, b| a.price.cmp(&b.price));

    let (Some(first), Some(last)) = (scored.first(), scored.last()) else {
        return Estimate::not_found();
    };

    match pairing {
        PricePairing::HighestLast => Estimate::found(last.price, first.price),
        PricePairing::HighestFirst => Estimate::found(first.price, last.price),
    }
}
