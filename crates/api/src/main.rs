use std::sync::Arc;

use anyhow::Context;

use digiwallet_api::app::{self, services::AppServices};
use digiwallet_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    digiwallet_observability::init(config.log_format);

    if config.uses_dev_jwt_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = Arc::new(AppServices::from_config(&config).await?);

    if let Some(admin) = &config.bootstrap_admin {
        services
            .accounts
            .bootstrap_admin(&admin.name, &admin.email)
            .await
            .context("failed to seed bootstrap admin")?;
    }

    let app = app::build_app(config.jwt_secret.clone(), services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
