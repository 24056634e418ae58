//! Store adapters: one search-and-extract routine driven by a per-retailer
//! [`StoreProfile`].

mod prestep;
pub mod profiles;

use std::time::Instant;

use panier_core::{Candidate, Estimate, ItemQuery, StoreId};
use rust_decimal::Decimal;

use crate::error::ScraperError;
use crate::estimate::{candidate_label, reduce, MAX_CANDIDATES};
use crate::parse::{brand_from_name, brand_from_tracking_json, parse_price, parse_split_price};
use crate::render::{NavigationOptions, PageElement, RenderedPage, Renderer};
use crate::score::fuzzy_score;

pub use prestep::PreStepReport;
pub use profiles::{BrandSource, PriceSource, StoreLocatorFlow, StoreProfile};

/// Searches one retailer and turns its result page into candidates.
#[derive(Debug, Clone)]
pub struct StoreAdapter {
    profile: StoreProfile,
}

impl StoreAdapter {
    #[must_use]
    pub fn for_store(store: StoreId) -> Self {
        Self::from_profile(StoreProfile::for_store(store))
    }

    #[must_use]
    pub fn from_profile(profile: StoreProfile) -> Self {
        Self { profile }
    }

    #[must_use]
    pub fn profile(&self) -> &StoreProfile {
        &self.profile
    }

    #[must_use]
    pub fn store(&self) -> StoreId {
        self.profile.store
    }

    /// Text typed into the retailer's search box; also the text candidates
    /// are scored against.
    #[must_use]
    pub fn query_text(&self, item: &ItemQuery) -> String {
        item.search_text(self.profile.query_fields)
    }

    /// Search result URL for `query`, form-encoded (`"a b"` → `a+b`).
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the profile's base URL does not
    /// parse.
    pub fn search_url(&self, query: &str) -> Result<String, ScraperError> {
        url::Url::parse_with_params(
            self.profile.search_base,
            &[(self.profile.query_param, query)],
        )
        .map(String::from)
        .map_err(|e| ScraperError::InvalidUrl {
            url: self.profile.search_base.to_owned(),
            reason: e.to_string(),
        })
    }

    /// Runs one search and returns up to five scored candidates.
    ///
    /// An empty list means nothing usable was found. The page is closed on
    /// every path.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when the page cannot be opened or the backend
    /// fails outside of per-listing extraction.
    pub async fn fetch_candidates(
        &self,
        renderer: &dyn Renderer,
        locality: &str,
        item: &ItemQuery,
    ) -> Result<Vec<Candidate>, ScraperError> {
        let store = self.store();
        let query = self.query_text(item);
        let url = self.search_url(&query)?;
        let started = Instant::now();

        tracing::debug!(%store, %url, "searching");
        let page = renderer
            .open(
                &url,
                NavigationOptions {
                    timeout: self.profile.navigation_timeout,
                },
            )
            .await?;

        let outcome = self.collect(page.as_ref(), locality, &query).await;
        if let Err(e) = page.close().await {
            tracing::warn!(%store, error = %e, "page close failed");
        }
        let candidates = outcome?;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if candidates.is_empty() {
            tracing::info!(%store, query = %query, elapsed_ms, "no matching product found");
        } else {
            tracing::debug!(
                %store,
                query = %query,
                count = candidates.len(),
                elapsed_ms,
                "candidates extracted"
            );
        }
        Ok(candidates)
    }

    /// [`fetch_candidates`](Self::fetch_candidates) followed by [`reduce`].
    ///
    /// # Errors
    ///
    /// Same as [`fetch_candidates`](Self::fetch_candidates).
    pub async fn estimate(
        &self,
        renderer: &dyn Renderer,
        locality: &str,
        item: &ItemQuery,
    ) -> Result<Estimate, ScraperError> {
        let candidates = self.fetch_candidates(renderer, locality, item).await?;
        Ok(reduce(
            &self.query_text(item),
            candidates,
            self.profile.pairing,
        ))
    }

    async fn collect(
        &self,
        page: &dyn RenderedPage,
        locality: &str,
        query: &str,
    ) -> Result<Vec<Candidate>, ScraperError> {
        let store = self.store();
        let report = prestep::run(page, &self.profile, locality).await;
        tracing::debug!(
            %store,
            consent = report.consent,
            store_selected = ?report.store_selected,
            "pre-steps done"
        );

        let selector = self.profile.listing_selector;
        if !page.wait_for(selector, self.profile.listing_timeout).await? {
            tracing::debug!(%store, selector, "listings did not render in time");
            return Ok(Vec::new());
        }

        let listings = page.query_all(selector).await?;
        let mut candidates = Vec::with_capacity(MAX_CANDIDATES);
        for (index, listing) in listings.iter().take(MAX_CANDIDATES).enumerate() {
            match self.extract(listing.as_ref()).await {
                Ok(Some((name, brand, price))) => {
                    let candidate = Candidate::unscored(name, brand, price);
                    let score = fuzzy_score(query, &candidate_label(&candidate));
                    candidates.push(candidate.with_score(score));
                }
                Ok(None) => {
                    tracing::debug!(%store, index, "listing dropped: missing name or price");
                }
                Err(e) => {
                    tracing::debug!(%store, index, error = %e, "listing dropped");
                }
            }
        }
        Ok(candidates)
    }

    async fn extract(
        &self,
        listing: &dyn PageElement,
    ) -> Result<Option<(String, String, Decimal)>, ScraperError> {
        let Some(name) = child_text(listing, self.profile.name_selector).await? else {
            return Ok(None);
        };

        let price = match &self.profile.price {
            PriceSource::Single(selector) => child_text(listing, selector)
                .await?
                .and_then(|raw| parse_price(&raw)),
            PriceSource::Split { integer, decimal } => {
                let integer = child_text(listing, integer).await?;
                let decimal = child_text(listing, decimal).await?;
                match (integer, decimal) {
                    (Some(i), Some(d)) => parse_split_price(&i, &d),
                    _ => None,
                }
            }
        };
        let Some(price) = price else {
            return Ok(None);
        };

        let brand = match &self.profile.brand {
            BrandSource::None => None,
            BrandSource::Selector(selector) => child_text(listing, selector).await.ok().flatten(),
            BrandSource::TrackingJson {
                attribute,
                key,
                known_brands,
            } => listing
                .attribute(attribute)
                .await
                .ok()
                .flatten()
                .and_then(|raw| brand_from_tracking_json(&raw, key))
                // Whole words only: "LU" does not match inside "blueberry".
                .or_else(|| brand_from_name(&name, known_brands)),
        };

        Ok(Some((name, brand.unwrap_or_default(), price)))
    }
}

/// Trimmed text of the first `selector` match under `element`, `None` when
/// absent or blank.
async fn child_text(
    element: &dyn PageElement,
    selector: &str,
) -> Result<Option<String>, ScraperError> {
    let Some(child) = element.query(selector).await? else {
        return Ok(None);
    };
    Ok(child
        .inner_text()
        .await?
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty()))
}
