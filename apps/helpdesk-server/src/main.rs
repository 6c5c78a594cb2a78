//! Helpdesk HTTP server

mod config;

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, LoggingConfig};
use helpdesk_service::infra::identity::GoTrueClient;
use helpdesk_service::infra::objects::StorageApiClient;
use helpdesk_service::HelpdeskServiceModule;
use sea_orm::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "helpdesk-server", version, about = "Helpdesk tickets and direct messages")]
struct Cli {
    /// YAML configuration file; `HELPDESK__*` environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log filter")?;
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.logging)?;

    let db = Database::connect(&config.database.url)
        .await
        .context("failed to connect to the database")?;
    if config.database.run_migrations {
        HelpdeskServiceModule::migrate(&db).await?;
    }

    let identity = Arc::new(GoTrueClient::new(config.auth.clone())?);
    let storage = Arc::new(StorageApiClient::new(config.storage.clone())?);
    let module = HelpdeskServiceModule::new(
        config.helpdesk,
        Arc::new(db),
        identity,
        storage,
        config.auth.public_domain,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    tracing::info!(bind = %config.server.bind, "helpdesk server listening");

    axum::serve(listener, module.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
