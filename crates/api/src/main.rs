//! tetherd - keeps the local reminder store in step with the remote.

use anyhow::Context;
use tether_api::AppContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let config = tether_infra::config::load().context("failed to load configuration")?;
    tether_infra::init_logging(&config.logging).context("failed to initialise logging")?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded .env"),
        Err(e) => tracing::debug!(error = %e, "no .env file loaded"),
    }

    tracing::info!(
        remote = %config.remote.base_url,
        backend = %config.storage.backend,
        "tetherd starting"
    );
    let ctx = AppContext::new_with_config(config)
        .await
        .context("failed to build application context")?;

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    tracing::info!(status = ?ctx.status(), "shutdown signal received");

    ctx.shutdown().await.context("shutdown failed")?;
    Ok(())
}
