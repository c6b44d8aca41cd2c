use anyhow::Context;

use gbau_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gbau_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = gbau_api::app::build_app(&config).await?;

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
