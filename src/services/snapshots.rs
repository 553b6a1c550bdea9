//! Stored provider payloads per template. Public reads serve a fresh snapshot
//! when one exists and fall back to a stale one when the provider fails.
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::{ProviderData, ProviderError, Providers};
use crate::models::Template;
use crate::registry::Source;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("template source '{0}' is not supported")]
    UnknownSource(String),
}

#[derive(Debug, FromRow)]
pub struct Snapshot {
    pub template_id: Uuid,
    pub title: Option<String>,
    pub data: Value,
    pub warning: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return true;
        };
        self.fetched_at
            .checked_add_signed(ttl)
            .map_or(true, |until| until > now)
    }
}

/// Data served for one template page, with a warning when it came from a stale snapshot.
#[derive(Debug)]
pub struct Served {
    pub data: ProviderData,
    pub warning: Option<String>,
}

pub async fn load(pool: &PgPool, template_id: Uuid) -> Result<Option<Snapshot>, sqlx::Error> {
    sqlx::query_as::<_, Snapshot>(
        r#"
        SELECT template_id, title, data, warning, fetched_at
        FROM template_snapshots
        WHERE template_id = $1
        "#,
    )
    .bind(template_id)
    .fetch_optional(pool)
    .await
}

pub async fn store(pool: &PgPool, template_id: Uuid, data: &ProviderData) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO template_snapshots (template_id, title, data, warning, fetched_at)
        VALUES ($1, $2, $3, NULL, NOW())
        ON CONFLICT (template_id) DO UPDATE
        SET title = EXCLUDED.title,
            data = EXCLUDED.data,
            warning = NULL,
            fetched_at = EXCLUDED.fetched_at
        "#,
    )
    .bind(template_id)
    .bind(&data.title)
    .bind(&data.data)
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn store_warning(pool: &PgPool, template_id: Uuid, warning: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE template_snapshots
        SET warning = $2
        WHERE template_id = $1
        "#,
    )
    .bind(template_id)
    .bind(warning)
    .execute(pool)
    .await
    .map(|_| ())
}

pub async fn refresh(
    pool: &PgPool,
    providers: &Providers,
    template: &Template,
) -> Result<ProviderData, SnapshotError> {
    let source = Source::from_tag(&template.source)
        .ok_or_else(|| SnapshotError::UnknownSource(template.source.clone()))?;
    match providers.fetch(source, &template.config_json).await {
        Ok(data) => {
            store(pool, template.id, &data).await?;
            Ok(data)
        }
        Err(error) => {
            let _ = store_warning(pool, template.id, &error.to_string()).await;
            Err(error.into())
        }
    }
}

pub async fn serve(
    pool: &PgPool,
    providers: &Providers,
    ttl: Duration,
    template: &Template,
) -> Result<Served, SnapshotError> {
    let existing = load(pool, template.id).await?;
    if let Some(snapshot) = existing.as_ref().filter(|snapshot| snapshot.is_fresh(ttl, Utc::now())) {
        return Ok(Served {
            data: ProviderData {
                title: snapshot.title.clone(),
                data: snapshot.data.clone(),
            },
            warning: snapshot.warning.clone(),
        });
    }

    match refresh(pool, providers, template).await {
        Ok(data) => Ok(Served { data, warning: None }),
        Err(SnapshotError::Provider(error)) => {
            let Some(snapshot) = existing else {
                return Err(error.into());
            };
            warn!(template_id = %template.id, %error, "serving stale snapshot");
            Ok(Served {
                data: ProviderData {
                    title: snapshot.title,
                    data: snapshot.data,
                },
                warning: Some(error.to_string()),
            })
        }
        Err(error) => Err(error),
    }
}

/// Refreshes every active template; returns how many snapshots were updated.
pub async fn refresh_all(pool: &PgPool, providers: &Providers) -> Result<usize, sqlx::Error> {
    let templates = sqlx::query_as::<_, Template>(
        r#"
        SELECT id, name, source, category, config_json, is_active, created_at, updated_at
        FROM templates
        WHERE is_active
        ORDER BY created_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut updated = 0usize;
    for template in &templates {
        match refresh(pool, providers, template).await {
            Ok(_) => updated += 1,
            Err(SnapshotError::Provider(error)) if error.is_rate_limited() => {
                warn!(template_id = %template.id, "provider rate limited; keeping previous snapshot");
            }
            Err(SnapshotError::Database(error)) => return Err(error),
            Err(error) => {
                warn!(template_id = %template.id, %error, "snapshot refresh failed");
            }
        }
    }
    info!(updated, total = templates.len(), "snapshots refreshed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(fetched_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            template_id: Uuid::new_v4(),
            title: None,
            data: json!({}),
            warning: None,
            fetched_at,
        }
    }

    #[test]
    fn freshness_uses_ttl() {
        let now = Utc::now();
        let ttl = Duration::from_secs(120);
        assert!(snapshot(now - chrono::Duration::seconds(60)).is_fresh(ttl, now));
        assert!(!snapshot(now - chrono::Duration::seconds(121)).is_fresh(ttl, now));
        assert!(!snapshot(now).is_fresh(Duration::ZERO, now));
    }
}
