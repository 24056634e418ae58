use std::net::SocketAddr;
use std::path::PathBuf;

use crate::stores::WorkerLimits;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub default_city: String,
    pub browser_headless: bool,
    pub browser_executable: Option<PathBuf>,
    pub browser_user_agent: String,
    pub worker_limits: WorkerLimits,
    pub store_concurrency: usize,
    pub geo_timeout_secs: u64,
    pub geo_user_agent: String,
    pub geo_max_retries: u32,
    pub geo_backoff_base_ms: u64,
    pub geocoder_urls: Vec<String>,
    pub overpass_urls: Vec<String>,
    pub rate_limit_per_minute: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("default_city", &self.default_city)
            .field("browser_headless", &self.browser_headless)
            .field("browser_executable", &self.browser_executable)
            .field("worker_limits", &self.worker_limits)
            .field("store_concurrency", &self.store_concurrency)
            .field("geo_timeout_secs", &self.geo_timeout_secs)
            .field("geo_max_retries", &self.geo_max_retries)
            .field("geo_backoff_base_ms", &self.geo_backoff_base_ms)
            .field("geocoder_urls", &self.geocoder_urls)
            .field("overpass_urls", &self.overpass_urls)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish_non_exhaustive()
    }
}
