use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use telegazeta_api::{
    auth,
    config::Config,
    registry::ContentRegistry,
    routes,
    services::Providers,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    auth::ensure_database(&pool)
        .await
        .context("database not reachable")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    match (&config.admin_username, &config.admin_password) {
        (Some(username), Some(password)) => auth::ensure_admin(&pool, username, password)
            .await
            .context("failed to create admin account")?,
        _ => tracing::warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; no admin account seeded"),
    }

    let state = AppState {
        pool,
        jwt_secret: config.jwt_secret,
        registry: Arc::new(ContentRegistry::standard()),
        providers: Providers::new(config.provider_keys),
        snapshot_ttl: config.snapshot_ttl,
    };

    let app = routes::router(state);

    tracing::info!("Telegazeta API listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .context("failed to bind address")?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
