pub mod app_config;
pub mod config;
pub mod items;
pub mod stores;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use items::{Candidate, Estimate, ItemQuery, ItemResult, QueryFields, NOT_FOUND_MESSAGE};
pub use stores::{StoreId, StoreLocation, UnsupportedStore, WorkerLimits};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
