use std::time::Duration;

use panier_core::{QueryFields, StoreId};

use crate::estimate::PricePairing;

const CONSENT_BUTTONS: &[&str] = &[
    r#"button:has-text("Continuer sans accepter")"#,
    r#"button:has-text("Tout accepter")"#,
];

const MONOPRIX_CONSENT_BUTTONS: &[&str] = &[
    r#"button:has-text("Continuer sans accepter")"#,
    r#"button:has-text("Tout accepter")"#,
    r#"button:has-text("Accepter")"#,
];

/// Brands recognised in U listing names when the tracking payload has none.
pub const U_KNOWN_BRANDS: &[&str] = &["BARILLA", "PANZANI", "LU", "DANONE", "PRESIDENT", "YOPLAIT"];

/// Where a listing's brand comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrandSource {
    /// Listings carry no brand.
    None,
    /// Text of a child element.
    Selector(&'static str),
    /// A key of a JSON attribute on the listing itself, falling back to the
    /// first of `known_brands` found in the product name.
    TrackingJson {
        attribute: &'static str,
        key: &'static str,
        known_brands: &'static [&'static str],
    },
}

/// Where a listing's price comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceSource {
    Single(&'static str),
    /// Integer and decimal parts rendered in separate nodes.
    Split {
        integer: &'static str,
        decimal: &'static str,
    },
}

/// Interactive store selection needed before a catalog shows local prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocatorFlow {
    pub open_link: &'static str,
    pub search_input: &'static str,
    pub first_result: &'static str,
    pub close_button: &'static str,
}

/// Everything retailer-specific about a search: URL, field order, selectors,
/// timeouts and price pairing.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreProfile {
    pub store: StoreId,
    pub search_base: &'static str,
    pub query_param: &'static str,
    pub query_fields: QueryFields,
    pub navigation_timeout: Duration,
    pub listing_selector: &'static str,
    pub listing_timeout: Duration,
    pub name_selector: &'static str,
    pub brand: BrandSource,
    pub price: PriceSource,
    pub pairing: PricePairing,
    pub consent_buttons: &'static [&'static str],
    pub store_locator: Option<StoreLocatorFlow>,
}

impl StoreProfile {
    #[must_use]
    pub fn for_store(store: StoreId) -> Self {
        match store {
            StoreId::Aldi => Self::aldi(),
            StoreId::Carrefour => Self::carrefour(),
            StoreId::Monoprix => Self::monoprix(),
            StoreId::U => Self::u(),
        }
    }

    #[must_use]
    pub fn aldi() -> Self {
        Self {
            store: StoreId::Aldi,
            search_base: "https://www.aldi.fr/recherche.html",
            query_param: "query",
            query_fields: QueryFields::NameBrand,
            navigation_timeout: Duration::from_secs(20),
            listing_selector: "div.product-tile",
            listing_timeout: Duration::from_secs(20),
            name_selector: "h2.product-tile__content__upper__product-name",
            brand: BrandSource::Selector("p.product-tile__content__upper__brand-name"),
            price: PriceSource::Single("span.tag__label--price"),
            pairing: PricePairing::HighestLast,
            consent_buttons: CONSENT_BUTTONS,
            store_locator: None,
        }
    }

    #[must_use]
    pub fn carrefour() -> Self {
        Self {
            store: StoreId::Carrefour,
            search_base: "https://www.carrefour.fr/s",
            query_param: "q",
            query_fields: QueryFields::NameBrandQuantity,
            navigation_timeout: Duration::from_secs(20),
            listing_selector: "article.product-list-card-plp-grid-new",
            listing_timeout: Duration::from_secs(20),
            name_selector: ".product-list-card-plp-grid-new__title",
            brand: BrandSource::Selector(".product-list-card-plp-grid-new__brand"),
            price: PriceSource::Split {
                integer: ".product-price__content.c-text--size-m",
                decimal: ".product-price__content.c-text--size-s",
            },
            pairing: PricePairing::HighestLast,
            consent_buttons: CONSENT_BUTTONS,
            store_locator: None,
        }
    }

    #[must_use]
    pub fn monoprix() -> Self {
        Self {
            store: StoreId::Monoprix,
            search_base: "https://courses.monoprix.fr/search",
            query_param: "q",
            query_fields: QueryFields::NameBrandQuantity,
            navigation_timeout: Duration::from_secs(10),
            listing_selector: "div[data-test^='fop-wrapper:']",
            listing_timeout: Duration::from_secs(5),
            name_selector: "h3[data-test='fop-title']",
            brand: BrandSource::None,
            price: PriceSource::Single("span[data-test='fop-price']"),
            pairing: PricePairing::HighestFirst,
            consent_buttons: MONOPRIX_CONSENT_BUTTONS,
            store_locator: None,
        }
    }

    #[must_use]
    pub fn u() -> Self {
        Self {
            store: StoreId::U,
            search_base: "https://www.coursesu.com/recherche",
            query_param: "q",
            query_fields: QueryFields::NameBrandQuantity,
            navigation_timeout: Duration::from_secs(45),
            listing_selector: "li.grid-tile",
            listing_timeout: Duration::from_secs(30),
            name_selector: ".product-name .name-link",
            brand: BrandSource::TrackingJson {
                attribute: "data-tc-product-tile",
                key: "brand",
                known_brands: U_KNOWN_BRANDS,
            },
            price: PriceSource::Single("[data-sup-product-price]"),
            pairing: PricePairing::HighestFirst,
            consent_buttons: CONSENT_BUTTONS,
            store_locator: Some(StoreLocatorFlow {
                open_link: r#"a:has-text("Trouver votre magasin")"#,
                search_input: "#store-search",
                first_result: ".store-delivery-mode-arrow",
                close_button: "span.ui-button-icon.ui-icon.ui-icon-closethick",
            }),
        }
    }
}
