use anyhow::Context;

use bizadmin_api::app::{self, services};
use bizadmin_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real deployments set variables directly.
    let _ = dotenvy::dotenv();
    bizadmin_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");

    let backends = services::Backends::connect(&config)
        .await
        .context("failed to initialise backends")?;
    if let Some(seed) = &config.seed_admin {
        services::seed_admin(backends.users.as_ref(), seed)
            .await
            .context("failed to seed administrator account")?;
    }

    let app = app::build_app(&config, services::AppServices::new(&config, backends));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
