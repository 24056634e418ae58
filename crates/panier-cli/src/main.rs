mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use panier_core::StoreId;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "panier-cli")]
#[command(about = "Estimate grocery prices at French supermarkets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Estimate one item at one store
    Estimate {
        /// aldi, carrefour, monoprix or u
        #[arg(long)]
        store: StoreId,
        /// Locality hint; defaults to `PANIER_DEFAULT_CITY`
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        brand: String,
        #[arg(long, default_value = "")]
        quantity: String,
    },
    /// Estimate every item of a JSON file at one store
    Batch {
        #[arg(long)]
        store: StoreId,
        #[arg(long)]
        city: Option<String>,
        /// JSON array of `{name, brand?, quantity?}`
        #[arg(long)]
        items: PathBuf,
        /// Concurrent searches; defaults to the store's worker limit
        #[arg(long)]
        workers: Option<usize>,
    },
    /// List supermarkets near an address or a point
    Stores {
        #[arg(long, conflicts_with_all = ["lat", "lon"], required_unless_present = "lat")]
        address: Option<String>,
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
        #[arg(long, default_value_t = 5.0)]
        radius_km: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = panier_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Estimate {
            store,
            city,
            name,
            brand,
            quantity,
        } => {
            let item = panier_core::ItemQuery::new(name, brand, quantity);
            commands::run_estimate(&config, store, city.as_deref(), item).await
        }
        Commands::Batch {
            store,
            city,
            items,
            workers,
        } => commands::run_batch(&config, store, city.as_deref(), &items, workers).await,
        Commands::Stores {
            address,
            lat,
            lon,
            radius_km,
        } => commands::run_stores(&config, address, lat.zip(lon), radius_km).await,
    }
}
