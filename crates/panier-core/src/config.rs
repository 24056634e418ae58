use std::fmt::Display;
use std::str::FromStr;

use crate::app_config::{AppConfig, Environment};
use crate::stores::WorkerLimits;
use crate::ConfigError;

const DEFAULT_BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let env = parse_environment(&or_default("PANIER_ENV", "development"));
    let bind_addr = parse_or(&lookup, "PANIER_BIND_ADDR", "0.0.0.0:8080")?;
    let log_level = or_default("PANIER_LOG_LEVEL", "info");
    let default_city = or_default("PANIER_DEFAULT_CITY", "Le Port-Marly");

    let browser_headless = parse_bool(
        "PANIER_BROWSER_HEADLESS",
        &or_default("PANIER_BROWSER_HEADLESS", "true"),
    )?;
    let browser_executable = lookup("PANIER_BROWSER_EXECUTABLE")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(Into::into);
    let browser_user_agent = or_default("PANIER_BROWSER_USER_AGENT", DEFAULT_BROWSER_USER_AGENT);

    let defaults = WorkerLimits::default();
    let worker_limits = WorkerLimits {
        aldi: parse_or(&lookup, "PANIER_WORKERS_ALDI", &defaults.aldi.to_string())?,
        carrefour: parse_or(&lookup, "PANIER_WORKERS_CARREFOUR", &defaults.carrefour.to_string())?,
        monoprix: parse_or(&lookup, "PANIER_WORKERS_MONOPRIX", &defaults.monoprix.to_string())?,
        u: parse_or(&lookup, "PANIER_WORKERS_U", &defaults.u.to_string())?,
    };
    let store_concurrency = parse_or(&lookup, "PANIER_STORE_CONCURRENCY", "2")?;

    let geo_timeout_secs = parse_or(&lookup, "PANIER_GEO_TIMEOUT_SECS", "25")?;
    let geo_user_agent = or_default(
        "PANIER_GEO_USER_AGENT",
        "panier/0.1 (grocery-price-estimator)",
    );
    let geo_max_retries = parse_or(&lookup, "PANIER_GEO_MAX_RETRIES", "3")?;
    let geo_backoff_base_ms = parse_or(&lookup, "PANIER_GEO_BACKOFF_BASE_MS", "500")?;
    let geocoder_urls = parse_url_list(
        "PANIER_GEOCODER_URLS",
        &or_default("PANIER_GEOCODER_URLS", "https://nominatim.openstreetmap.org"),
    )?;
    let overpass_urls = parse_url_list(
        "PANIER_OVERPASS_URLS",
        &or_default(
            "PANIER_OVERPASS_URLS",
            "https://overpass-api.de/api/interpreter,https://overpass.kumi.systems/api/interpreter",
        ),
    )?;

    let rate_limit_per_minute = parse_or(&lookup, "PANIER_RATE_LIMIT_PER_MINUTE", "60")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        default_city,
        browser_headless,
        browser_executable,
        browser_user_agent,
        worker_limits,
        store_concurrency,
        geo_timeout_secs,
        geo_user_agent,
        geo_max_retries,
        geo_backoff_base_ms,
        geocoder_urls,
        overpass_urls,
        rate_limit_per_minute,
    })
}

/// Reads `var` (or `default` when unset) and parses it as `T`.
fn parse_or<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

/// Splits a comma-separated endpoint list, dropping blanks and trailing slashes.
fn parse_url_list(var: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let urls: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_owned())
        .collect();

    if urls.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: "at least one endpoint is required".to_string(),
        });
    }
    if let Some(bad) = urls
        .iter()
        .find(|u| !(u.starts_with("http://") || u.starts_with("https://")))
    {
        return Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("\"{bad}\" is not an http(s) URL"),
        });
    }
    Ok(urls)
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
