use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Retailers with a store adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreId {
    Aldi,
    Carrefour,
    Monoprix,
    U,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported store: {0}")]
pub struct UnsupportedStore(pub String);

impl StoreId {
    pub const ALL: [StoreId; 4] = [
        StoreId::Aldi,
        StoreId::Carrefour,
        StoreId::Monoprix,
        StoreId::U,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoreId::Aldi => "aldi",
            StoreId::Carrefour => "carrefour",
            StoreId::Monoprix => "monoprix",
            StoreId::U => "u",
        }
    }

    /// Picks the retailer behind a nearby-store record by looking for a known
    /// brand token, first in the OSM `brand` tag and then in the display name.
    ///
    /// `"Carrefour City"` → Carrefour, `"Super U"` / `"U Express"` → U.
    /// Returns `None` for retailers without an adapter.
    #[must_use]
    pub fn recognize(name: &str, brand: &str) -> Option<Self> {
        recognize_tokens(brand).or_else(|| recognize_tokens(name))
    }
}

fn recognize_tokens(text: &str) -> Option<StoreId> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.contains(&"aldi") {
        Some(StoreId::Aldi)
    } else if tokens.contains(&"carrefour") {
        Some(StoreId::Carrefour)
    } else if tokens.contains(&"monoprix") {
        Some(StoreId::Monoprix)
    } else if tokens.iter().any(|t| matches!(*t, "u" | "utile")) {
        Some(StoreId::U)
    } else {
        None
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreId {
    type Err = UnsupportedStore;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aldi" => Ok(StoreId::Aldi),
            "carrefour" => Ok(StoreId::Carrefour),
            "monoprix" => Ok(StoreId::Monoprix),
            "u" => Ok(StoreId::U),
            _ => Err(UnsupportedStore(s.to_owned())),
        }
    }
}

/// A physical supermarket near a searched location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreLocation {
    pub name: String,
    pub brand: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `"street, postcode, city"`, any missing part omitted. May be empty.
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_opened: Option<bool>,
    /// Great-circle distance from the search origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl StoreLocation {
    /// Locality hint handed to a store adapter: the address, or the display
    /// name when no address is known.
    #[must_use]
    pub fn locality_hint(&self) -> &str {
        if self.address.trim().is_empty() {
            &self.name
        } else {
            &self.address
        }
    }
}

/// Simultaneous adapter sessions allowed per retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerLimits {
    pub aldi: usize,
    pub carrefour: usize,
    pub monoprix: usize,
    pub u: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            aldi: 2,
            carrefour: 2,
            monoprix: 3,
            u: 1,
        }
    }
}

impl WorkerLimits {
    /// Cap for `store`, never below one.
    #[must_use]
    pub fn for_store(&self, store: StoreId) -> usize {
        let n = match store {
            StoreId::Aldi => self.aldi,
            StoreId::Carrefour => self.carrefour,
            StoreId::Monoprix => self.monoprix,
            StoreId::U => self.u,
        };
        n.max(1)
    }
}
