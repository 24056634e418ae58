//! Parsing of raw listing text pulled out of retailer markup.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::normalize::normalize_text;

/// Parses a displayed price such as `"4,55 €"`, `"1.99"` or `"12,\u{a0}49€"`.
///
/// Currency signs and all whitespace (including non-breaking spaces) are
/// removed and a decimal comma becomes a dot. Returns `None` for anything that
/// is not a strictly positive decimal.
#[must_use]
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&cleaned)
        .ok()
        .filter(|price| price.is_sign_positive() && !price.is_zero())
}

/// Parses a price rendered as two nodes: the integer part (`"2"`) and the
/// decimal part with its separator (`",49€"`). The two are concatenated
/// before parsing.
#[must_use]
pub fn parse_split_price(integer_part: &str, decimal_part: &str) -> Option<Decimal> {
    parse_price(&format!("{}{}", integer_part.trim(), decimal_part.trim()))
}

/// Reads the `key` field out of a JSON tracking attribute such as
/// `data-tc-product-tile='{"brand":"BARILLA",...}'`.
///
/// Returns `None` when the attribute is not JSON, the key is absent or the
/// value is a blank string.
#[must_use]
pub fn brand_from_tracking_json(raw: &str, key: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    value
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Returns the first of `known_brands` that appears as a whole word in
/// `name`, comparing normalized text so `"Président"` matches `"PRESIDENT"`.
#[must_use]
pub fn brand_from_name(name: &str, known_brands: &[&str]) -> Option<String> {
    let normalized = normalize_text(name);
    let words: Vec<&str> = normalized.split(' ').collect();
    known_brands
        .iter()
        .find(|brand| {
            let brand = normalize_text(brand);
            let brand_words: Vec<&str> = brand.split(' ').collect();
            words
                .windows(brand_words.len())
                .any(|window| window == brand_words.as_slice())
        })
        .map(|brand| (*brand).to_owned())
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
