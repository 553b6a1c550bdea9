use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telegazeta_api::{config::Config, services::snapshots::refresh_all, services::Providers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("database not reachable")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let providers = Providers::new(config.provider_keys);
    let mut interval = tokio::time::interval(config.worker_interval);
    tracing::info!(every = ?config.worker_interval, "snapshot worker started");

    loop {
        interval.tick().await;
        if let Err(error) = refresh_all(&pool, &providers).await {
            tracing::error!(?error, "failed to refresh template snapshots");
        }
    }
}
