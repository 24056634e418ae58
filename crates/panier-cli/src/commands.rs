use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use panier_core::{AppConfig, ItemQuery, ItemResult, StoreId, StoreLocation};
use panier_geo::{Coordinates, GeoClient, GeoOrigin};
use panier_scraper::{summarize, BatchSummary, ChromiumRenderer, Estimator};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct BatchReport {
    total_items: usize,
    summary: BatchSummary,
    results: Vec<ItemResult>,
}

#[derive(Debug, Serialize)]
struct StoreLine {
    #[serde(flatten)]
    location: StoreLocation,
    store: Option<StoreId>,
    supported: bool,
}

fn estimator(config: &AppConfig) -> Estimator {
    let renderer = ChromiumRenderer::new(config.browser_user_agent.clone())
        .headless(config.browser_headless)
        .executable(config.browser_executable.clone());
    Estimator::new(Arc::new(renderer), config.worker_limits)
}

fn locality<'a>(config: &'a AppConfig, city: Option<&'a str>) -> &'a str {
    city.map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(config.default_city.as_str())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Reads a JSON array of items.
pub(crate) fn read_items(path: &Path) -> anyhow::Result<Vec<ItemQuery>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read items file {}", path.display()))?;
    let items: Vec<ItemQuery> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of items", path.display()))?;
    if let Some(index) = items.iter().position(|i| i.name.trim().is_empty()) {
        anyhow::bail!("item {index} in {} has an empty name", path.display());
    }
    Ok(items)
}

pub(crate) async fn run_estimate(
    config: &AppConfig,
    store: StoreId,
    city: Option<&str>,
    item: ItemQuery,
) -> anyhow::Result<()> {
    let estimate = estimator(config)
        .estimate(&item, store, locality(config, city))
        .await?;
    print_json(&ItemResult::from_estimate(item, store, estimate))
}

pub(crate) async fn run_batch(
    config: &AppConfig,
    store: StoreId,
    city: Option<&str>,
    items_path: &Path,
    workers: Option<usize>,
) -> anyhow::Result<()> {
    let items = read_items(items_path)?;
    let workers = workers.unwrap_or_else(|| config.worker_limits.for_store(store));
    tracing::info!(%store, items = items.len(), workers, "running batch");

    let results = estimator(config)
        .estimate_batch(&items, store, locality(config, city), workers)
        .await;
    print_json(&BatchReport {
        total_items: items.len(),
        summary: summarize(&results),
        results,
    })
}

pub(crate) async fn run_stores(
    config: &AppConfig,
    address: Option<String>,
    point: Option<(f64, f64)>,
    radius_km: f64,
) -> anyhow::Result<()> {
    let origin = match (point, address) {
        (Some((latitude, longitude)), _) => {
            GeoOrigin::Coordinates(Coordinates::new(latitude, longitude)?)
        }
        (None, Some(address)) => GeoOrigin::Address(address),
        (None, None) => anyhow::bail!("either --address or --lat/--lon is required"),
    };

    let stores = GeoClient::from_config(config)?
        .find_supermarkets(&origin, radius_km)
        .await?;
    let lines: Vec<StoreLine> = stores
        .into_iter()
        .map(|location| {
            let store = StoreId::recognize(&location.name, &location.brand);
            StoreLine {
                location,
                store,
                supported: store.is_some(),
            }
        })
        .collect();
    print_json(&lines)
}
