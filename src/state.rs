use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::ContentRegistry;
use crate::services::Providers;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub registry: Arc<ContentRegistry>,
    pub providers: Providers,
    pub snapshot_ttl: Duration,
}
