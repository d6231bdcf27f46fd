use anyhow::Context;

use almox_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    almox_observability::init(config.log_format);

    for var in config.insecure_defaults() {
        tracing::warn!(var, "not set; using insecure development default");
    }

    let app = almox_api::app::build_app(&config)
        .await
        .context("failed to open the database")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        invoice_policy = ?config.invoice_policy,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
