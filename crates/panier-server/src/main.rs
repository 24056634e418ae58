mod api;
mod middleware;

use std::sync::Arc;

use panier_geo::GeoClient;
use panier_scraper::{ChromiumRenderer, Estimator};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::RateLimitState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = panier_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let renderer = ChromiumRenderer::new(config.browser_user_agent.clone())
        .headless(config.browser_headless)
        .executable(config.browser_executable.clone());
    let estimator = Estimator::new(Arc::new(renderer), config.worker_limits);
    let geo = GeoClient::from_config(&config)?;

    let state = AppState {
        estimator,
        geo: Arc::new(geo),
        default_city: config.default_city.as_str().into(),
        store_concurrency: config.store_concurrency,
    };
    let app = build_app(
        state,
        RateLimitState::per_minute(config.rate_limit_per_minute),
    );

    tracing::info!(
        env = %config.env,
        bind_addr = %config.bind_addr,
        workers = ?config.worker_limits,
        "starting panier server"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
