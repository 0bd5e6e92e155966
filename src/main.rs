use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quote_desk::api::{AppState, build_app};
use quote_desk::config::load_app_config;
use quote_desk::database::Database;
use quote_desk::price_finder::PriceFinder;
use quote_desk::scraper::ProxyFetcher;
use quote_desk::traits::UpstreamConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting quotation manager");

    let database = Database::new(&config.database_url, config.db_max_connections).await?;

    let upstream = UpstreamConfig::staticice(&config.upstream_base_url);
    let fetcher = ProxyFetcher::new(upstream, &config.upstream_user_agent)?;
    let finder = PriceFinder::new(Arc::new(fetcher), config.search.clone());

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    if static_dir.is_none() {
        info!(
            "Static directory {} not found, serving the API only",
            config.static_dir.display()
        );
    }
    let app = build_app(AppState { database, finder }, static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Received shutdown signal, starting graceful shutdown");
}
