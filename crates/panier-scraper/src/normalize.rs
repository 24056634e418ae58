//! Text normalization applied to queries and listing labels before scoring.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static NON_ALNUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Lower-cases `text`, strips diacritics via NFKD decomposition, and collapses
/// every run of characters outside `[a-z0-9]` into a single space.
///
/// `"Crème Fraîche (20cl)"` becomes `"creme fraiche 20cl"`. Total and
/// idempotent: the output only ever contains `[a-z0-9 ]`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let decomposed: String = text
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    NON_ALNUM_RE
        .replace_all(&decomposed, " ")
        .trim()
        .to_owned()
}
