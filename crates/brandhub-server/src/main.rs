//! BrandHub Server: Application entry point.

use anyhow::Context;
use brandhub_db::{CatalogScope, DbManager, WsBrandConnector};
use brandhub_server::{BrandOperations, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("brandhub=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting BrandHub server...");

    let config = ServerConfig::from_env()?;
    config.validate()?;

    let manager = DbManager::connect(&config.db)
        .await
        .context("connect to SurrealDB")?;
    brandhub_db::run_migrations(manager.client())
        .await
        .context("run catalog migrations")?;

    let operations = BrandOperations::new(
        manager.client().clone(),
        config.db.catalog_scope(),
        WsBrandConnector::new(config.db.url.clone()),
        config.auth.clone(),
    );
    tracing::info!(
        namespace = %config.db.namespace,
        catalog = %config.db.database,
        cached_brands = operations.router().cached_count(),
        "BrandHub ready"
    );

    // The transport layer mounts `operations`; until shutdown there is
    // nothing else for the process to do.
    tokio::signal::ctrl_c()
        .await
        .context("wait for shutdown signal")?;

    tracing::info!("BrandHub server stopped.");
    Ok(())
}
