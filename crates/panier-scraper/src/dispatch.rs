//! Bounded fan-out of adapter runs over items and nearby stores.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use panier_core::{Estimate, ItemQuery, ItemResult, StoreId, StoreLocation, WorkerLimits};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ScraperError;
use crate::render::Renderer;
use crate::stores::StoreAdapter;

/// Entry point for price estimation: owns the page renderer and the
/// per-retailer worker caps.
#[derive(Clone)]
pub struct Estimator {
    renderer: Arc<dyn Renderer>,
    limits: WorkerLimits,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Estimator {
    #[must_use]
    pub fn new(renderer: Arc<dyn Renderer>, limits: WorkerLimits) -> Self {
        Self { renderer, limits }
    }

    #[must_use]
    pub fn worker_limits(&self) -> WorkerLimits {
        self.limits
    }

    /// Estimates one item at one retailer.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] on infrastructure failure. Not finding the
    /// item is an unsuccessful [`Estimate`], not an error.
    pub async fn estimate(
        &self,
        item: &ItemQuery,
        store: StoreId,
        locality: &str,
    ) -> Result<Estimate, ScraperError> {
        StoreAdapter::for_store(store)
            .estimate(self.renderer.as_ref(), locality, item)
            .await
    }

    /// Estimates every item at `store` with at most `concurrency` searches in
    /// flight.
    ///
    /// Always returns exactly one [`ItemResult`] per item, in completion
    /// order. A failed search becomes a failed record and never stops the
    /// others.
    pub async fn estimate_batch(
        &self,
        items: &[ItemQuery],
        store: StoreId,
        locality: &str,
        concurrency: usize,
    ) -> Vec<ItemResult> {
        stream::iter(items.iter().cloned())
            .map(|item| async move {
                match self.estimate(&item, store, locality).await {
                    Ok(estimate) => ItemResult::from_estimate(item, store, estimate),
                    Err(e) => {
                        tracing::error!(%store, item = %item.name, error = %e, "estimate failed");
                        ItemResult::failed(item, store, e.to_string())
                    }
                }
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await
    }

    /// Estimates `items` at every recognised store in `stores`.
    ///
    /// Stores run `store_concurrency` at a time; inside each store the items
    /// run under that retailer's [`WorkerLimits`] cap. Stores of unsupported
    /// retailers are skipped.
    pub async fn estimate_nearby(
        &self,
        stores: &[StoreLocation],
        items: &[ItemQuery],
        store_concurrency: usize,
    ) -> Vec<StoreBatch> {
        let targets: Vec<(StoreLocation, StoreId)> = stores
            .iter()
            .filter_map(|location| {
                let store = StoreId::recognize(&location.name, &location.brand);
                if store.is_none() {
                    tracing::debug!(name = %location.name, "no adapter for store, skipped");
                }
                store.map(|id| (location.clone(), id))
            })
            .collect();

        tracing::info!(
            stores = targets.len(),
            items = items.len(),
            "estimating nearby stores"
        );

        stream::iter(targets)
            .map(|(location, store)| async move {
                let locality = location.locality_hint().to_owned();
                let results = self
                    .estimate_batch(items, store, &locality, self.limits.for_store(store))
                    .await;
                StoreBatch {
                    location,
                    store,
                    results,
                }
            })
            .buffer_unordered(store_concurrency.max(1))
            .collect()
            .await
    }
}

/// All item results for one nearby store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreBatch {
    pub location: StoreLocation,
    pub store: StoreId,
    pub results: Vec<ItemResult>,
}

/// Totals over the successful results of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub successful: usize,
    pub failed: usize,
    pub total_low: Decimal,
    pub total_high: Decimal,
}

impl StoreBatch {
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        summarize(&self.results)
    }
}

/// Counts successes and failures and sums the prices of successful items.
#[must_use]
pub fn summarize(results: &[ItemResult]) -> BatchSummary {
    let ok = results.iter().filter(|r| r.success);
    BatchSummary {
        successful: ok.clone().count(),
        failed: results.iter().filter(|r| !r.success).count(),
        total_low: ok.clone().filter_map(|r| r.lowest_price).sum(),
        total_high: ok.filter_map(|r| r.highest_price).sum(),
    }
}
