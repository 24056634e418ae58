use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::stores::StoreId;

/// Error text carried by an [`ItemResult`] when the search ran but nothing
/// usable came back.
pub const NOT_FOUND_MESSAGE: &str = "no matching product found";

/// A grocery item as requested by a caller.
///
/// Only `name` is required on the wire; `brand` and `quantity` default to
/// empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemQuery {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub quantity: String,
}

/// Which item fields a retailer puts into its search box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFields {
    NameBrand,
    NameBrandQuantity,
}

impl ItemQuery {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            brand: brand.into(),
            quantity: quantity.into(),
        }
    }

    /// Builds the search string for a retailer: the selected fields joined by
    /// single spaces, empty fields skipped, result trimmed.
    #[must_use]
    pub fn search_text(&self, fields: QueryFields) -> String {
        let parts: &[&str] = match fields {
            QueryFields::NameBrand => &[&self.name, &self.brand],
            QueryFields::NameBrandQuantity => &[&self.name, &self.brand, &self.quantity],
        };
        parts
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One parsed product listing from a search result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    /// Empty when the listing carries no brand.
    pub brand: String,
    pub price: Decimal,
    /// Similarity to the query in `0..=100`; `None` until scored.
    pub score: Option<u8>,
}

impl Candidate {
    #[must_use]
    pub fn unscored(name: impl Into<String>, brand: impl Into<String>, price: Decimal) -> Self {
        Self {
            name: name.into(),
            brand: brand.into(),
            price,
            score: None,
        }
    }

    #[must_use]
    pub fn with_score(mut self, score: u8) -> Self {
        self.score = Some(score);
        self
    }
}

/// Low/high price estimate for one item at one store.
///
/// `success == false` with both prices absent is the normal "not found"
/// outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub highest_price: Option<Decimal>,
    pub lowest_price: Option<Decimal>,
    pub success: bool,
}

impl Estimate {
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            highest_price: None,
            lowest_price: None,
            success: false,
        }
    }

    #[must_use]
    pub fn found(highest_price: Decimal, lowest_price: Decimal) -> Self {
        Self {
            highest_price: Some(highest_price),
            lowest_price: Some(lowest_price),
            success: true,
        }
    }
}

/// Per-item record produced by a batch run. Exactly one exists per input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub item: ItemQuery,
    pub store: StoreId,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    /// Converts an estimate into a result record. A soft not-found becomes
    /// `success: false` with [`NOT_FOUND_MESSAGE`].
    #[must_use]
    pub fn from_estimate(item: ItemQuery, store: StoreId, estimate: Estimate) -> Self {
        if estimate.success {
            Self {
                item,
                store,
                success: true,
                highest_price: estimate.highest_price,
                lowest_price: estimate.lowest_price,
                error: None,
            }
        } else {
            Self::failed(item, store, NOT_FOUND_MESSAGE)
        }
    }

    #[must_use]
    pub fn failed(item: ItemQuery, store: StoreId, error: impl Into<String>) -> Self {
        Self {
            item,
            store,
            success: false,
            highest_price: None,
            lowest_price: None,
            error: Some(error.into()),
        }
    }
}
