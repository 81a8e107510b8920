use anyhow::Context;

use stockledger_api::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    stockledger_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(store = ?config.store.backend, "configuration loaded");

    let app = stockledger_api::app::build_app(&config.store)
        .await
        .context("invalid store configuration")?;

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
