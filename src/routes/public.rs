use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::warn;

use crate::{
    auth::internal_error,
    models::{CategoryInfo, Page, PageContent, PageDetail, PageSummary, PageType},
    numbering::CategoryCode,
    registry::RegistryEntry,
    render::{self, TeletextPage},
    resolver::{resolve, PageFacts, Resolution, UnresolvedReason},
    routes::pages::{fetch_active_page_by_number, fetch_template},
    services::{schemas::schema_for, snapshots, ProviderData, ProviderError},
    state::AppState,
};

#[derive(Deserialize)]
pub struct PagesQuery {
    pub category: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub resolution: Resolution,
    pub page: TeletextPage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

pub async fn list_categories() -> Json<Vec<CategoryInfo>> {
    Json(CategoryCode::ALL.into_iter().map(CategoryInfo::from).collect())
}

pub async fn list_pages(
    State(state): State<AppState>,
    Query(params): Query<PagesQuery>,
) -> Result<Json<Vec<PageSummary>>, (StatusCode, String)> {
    let category = params.category.as_deref().map(|value| {
        CategoryCode::parse(value)
            .map(|code| code.as_str().to_string())
            .unwrap_or_else(|| value.to_string())
    });
    let records = sqlx::query_as::<_, PageSummary>(
        r#"
        SELECT id, page_number, page_type, title, category, description
        FROM pages
        WHERE is_active
          AND ($1::text IS NULL OR category = $1)
        ORDER BY page_number
        "#,
    )
    .bind(category)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(records))
}

pub async fn get_page(
    State(state): State<AppState>,
    Path(page_number): Path<i32>,
) -> Result<Json<PageDetail>, (StatusCode, String)> {
    let page = fetch_active_page_by_number(&state.pool, page_number)
        .await
        .map_err(internal_error)?;
    let resolution = resolve(page_number, page.as_ref().map(PageFacts::from), &state.registry);

    let detail = match (&resolution, page) {
        (Resolution::Manual { .. }, Some(page)) => manual_detail(page),
        (Resolution::Active { entry, .. }, Some(page)) => {
            let served = page_data(&state, page_number, Some(&page), Some(entry)).await?;
            template_detail(&page, served)
        }
        (Resolution::Active { entry, .. }, None) => {
            let served = page_data(&state, page_number, None, Some(entry)).await?;
            legacy_detail(page_number, entry, served)
        }
        (Resolution::Pending { entry, .. }, page) => pending_detail(page_number, page.as_ref(), entry),
        (Resolution::Unresolved { reason, .. }, _) => {
            return Err(unresolved_rejection(page_number, reason))
        }
        (Resolution::Manual { .. }, None) => {
            return Err((StatusCode::NOT_FOUND, format!("Page {page_number} not found")))
        }
    };

    record_view(&state.pool, page_number).await;
    Ok(Json(detail))
}

pub async fn view_page(
    State(state): State<AppState>,
    Path(page_number): Path<i32>,
) -> Result<Json<ViewResponse>, (StatusCode, String)> {
    let page = fetch_active_page_by_number(&state.pool, page_number)
        .await
        .map_err(internal_error)?;
    let resolution = resolve(page_number, page.as_ref().map(PageFacts::from), &state.registry);

    let (rendered, warning) = match &resolution {
        Resolution::Manual { .. } => {
            let page = page
                .as_ref()
                .ok_or((StatusCode::NOT_FOUND, format!("Page {page_number} not found")))?;
            let rendered = render::render_manual(
                page_number,
                &page.title,
                page.description.as_deref(),
                page.content.as_deref(),
            );
            (rendered, None)
        }
        Resolution::Active {
            integration, entry, ..
        } => {
            let served = page_data(&state, page_number, page.as_ref(), Some(entry)).await?;
            let lines = integration
                .render(&served.data.data)
                .map_err(|error| (StatusCode::BAD_GATEWAY, error.to_string()))?;
            let title = served
                .data
                .title
                .or_else(|| page.as_ref().map(|page| page.title.clone()))
                .unwrap_or_else(|| entry.name.to_string());
            let rendered = TeletextPage {
                page_number,
                title,
                lines,
            };
            (rendered, served.warning)
        }
        Resolution::Pending { entry, .. } => (render::render_pending(page_number, entry), None),
        Resolution::Unresolved { reason, .. } => {
            (render::render_unresolved(page_number, reason), None)
        }
    };

    if !matches!(resolution, Resolution::Unresolved { .. }) {
        record_view(&state.pool, page_number).await;
    }

    Ok(Json(ViewResponse {
        resolution,
        page: rendered,
        warning,
    }))
}

/// Provider data for a template-backed page, or for a legacy slot served from
/// its registry defaults.
async fn page_data(
    state: &AppState,
    page_number: i32,
    page: Option<&Page>,
    entry: Option<&RegistryEntry>,
) -> Result<snapshots::Served, (StatusCode, String)> {
    if let Some(template_id) = page.and_then(|page| page.template_id) {
        let template = fetch_template(&state.pool, template_id)
            .await
            .map_err(internal_error)?
            .ok_or((StatusCode::NOT_FOUND, format!("Template for page {page_number} not found")))?;
        return snapshots::serve(&state.pool, &state.providers, state.snapshot_ttl, &template)
            .await
            .map_err(snapshot_rejection);
    }

    let entry = entry.ok_or((
        StatusCode::NOT_FOUND,
        format!("No data source configured for page {page_number}"),
    ))?;
    let config = slot_config(entry).map_err(provider_rejection)?;
    let data = state
        .providers
        .fetch(entry.source, config)
        .await
        .map_err(provider_rejection)?;
    Ok(snapshots::Served { data, warning: None })
}

/// Provider parameters a fixed slot is served with when no template backs it.
fn slot_config(entry: &RegistryEntry) -> Result<&Value, ProviderError> {
    if entry.default_config.is_null() {
        let field = schema_for(entry.source)
            .required
            .first()
            .copied()
            .unwrap_or("configJson");
        return Err(ProviderError::MissingConfig(field));
    }
    Ok(&entry.default_config)
}

/// Detail for a page whose integration is announced but not live yet. No
/// provider is contacted.
fn pending_detail(page_number: i32, page: Option<&Page>, entry: &RegistryEntry) -> PageDetail {
    let served = snapshots::Served {
        data: ProviderData {
            title: None,
            data: serde_json::json!({ "status": entry.status }),
        },
        warning: None,
    };
    match page {
        Some(page) => template_detail(page, served),
        None => legacy_detail(page_number, entry, served),
    }
}

fn unresolved_rejection(page_number: i32, reason: &UnresolvedReason) -> (StatusCode, String) {
    let status = match reason {
        UnresolvedReason::NotFound => StatusCode::NOT_FOUND,
        UnresolvedReason::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
        UnresolvedReason::UnknownSource { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, reason.message(page_number))
}

fn manual_detail(page: Page) -> PageDetail {
    PageDetail {
        id: Some(page.id),
        page_number: page.page_number,
        page_type: page.page_type,
        title: page.title.clone(),
        category: page.category,
        content: PageContent {
            title: page.title,
            description: page.description,
            additional_data: page
                .content
                .map(|content| serde_json::json!({ "content": content }))
                .unwrap_or(Value::Null),
            source: None,
        },
        warning: None,
    }
}

fn template_detail(page: &Page, served: snapshots::Served) -> PageDetail {
    let ProviderData { title, data } = served.data;
    PageDetail {
        id: Some(page.id),
        page_number: page.page_number,
        page_type: page.page_type.clone(),
        title: page.title.clone(),
        category: page.category.clone(),
        content: PageContent {
            title: title.unwrap_or_else(|| page.title.clone()),
            description: page.description.clone(),
            additional_data: data,
            source: page.source.clone(),
        },
        warning: served.warning,
    }
}

fn legacy_detail(page_number: i32, entry: &RegistryEntry, served: snapshots::Served) -> PageDetail {
    let ProviderData { title, data } = served.data;
    PageDetail {
        id: None,
        page_number,
        page_type: PageType::Template.as_str().to_string(),
        title: entry.name.to_string(),
        category: entry.category.as_str().to_string(),
        content: PageContent {
            title: title.unwrap_or_else(|| entry.name.to_string()),
            description: Some(entry.description.to_string()),
            additional_data: data,
            source: Some(entry.source.as_str().to_string()),
        },
        warning: served.warning,
    }
}

async fn record_view(pool: &PgPool, page_number: i32) {
    let result = sqlx::query(
        r#"
        INSERT INTO page_views (page_number, views)
        VALUES ($1, 1)
        ON CONFLICT (page_number) DO UPDATE
        SET views = page_views.views + 1
        "#,
    )
    .bind(page_number)
    .execute(pool)
    .await;

    if let Err(error) = result {
        warn!(page_number, %error, "failed to record page view");
    }
}

pub(crate) fn provider_rejection(error: ProviderError) -> (StatusCode, String) {
    let status = match error {
        ProviderError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ProviderError::MissingKey(_) => StatusCode::SERVICE_UNAVAILABLE,
        ProviderError::MissingConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, error.to_string())
}

fn snapshot_rejection(error: snapshots::SnapshotError) -> (StatusCode, String) {
    match error {
        snapshots::SnapshotError::Provider(error) => provider_rejection(error),
        snapshots::SnapshotError::Database(error) => internal_error(error),
        error @ snapshots::SnapshotError::UnknownSource(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ContentRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn categories_cover_the_whole_namespace() {
        let Json(categories) = list_categories().await;
        assert_eq!(categories.len(), 9);
        assert_eq!(categories[0].original_name, "NEWS");
        assert_eq!(categories[8].start, 901);
    }

    #[test]
    fn rate_limits_are_distinguishable() {
        assert_eq!(
            provider_rejection(ProviderError::RateLimited).0,
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            provider_rejection(ProviderError::MissingKey("NEWS_API_KEY")).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn sports_slots_without_feed_report_missing_config() {
        let registry = ContentRegistry::standard();
        for number in [201, 202, 203] {
            let entry = registry.by_number(number).unwrap();
            let error = slot_config(entry).unwrap_err();
            assert!(matches!(error, ProviderError::MissingConfig("feedUrl")));
            assert_eq!(provider_rejection(error).0, StatusCode::UNPROCESSABLE_ENTITY);
        }
        let usd = registry.by_number(801).unwrap();
        assert_eq!(slot_config(usd).unwrap()["currencyCode"], "USD");
    }

    #[test]
    fn soon_slots_are_described_without_provider_data() {
        let registry = ContentRegistry::standard();
        for number in [102, 302] {
            let entry = registry.by_number(number).unwrap();
            let detail = pending_detail(number, None, entry);
            assert_eq!(detail.page_number, number);
            assert!(detail.id.is_none());
            assert_eq!(detail.content.additional_data, json!({ "status": "soon" }));
            assert_eq!(detail.content.description.as_deref(), Some(entry.description));
        }
    }

    #[test]
    fn unresolved_pages_keep_their_reason_in_the_status() {
        let (status, message) = unresolved_rejection(999_999, &UnresolvedReason::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(message, "page 999999 does not exist");

        let horoscope = UnresolvedReason::NotImplemented {
            source: crate::registry::Source::Horoscope,
        };
        let (status, message) = unresolved_rejection(701, &horoscope);
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(message, "source HOROSCOPE recognized but rendering not implemented");

        let unknown = UnresolvedReason::UnknownSource { tag: "crypto".into() };
        assert_eq!(unresolved_rejection(950, &unknown).0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn legacy_detail_uses_registry_metadata() {
        let registry = ContentRegistry::standard();
        let entry = registry.by_number(801).unwrap();
        let served = snapshots::Served {
            data: ProviderData {
                title: None,
                data: json!({ "code": "USD", "rates": [] }),
            },
            warning: None,
        };
        let detail = legacy_detail(801, entry, served);
        assert_eq!(detail.category, "FINANCE");
        assert_eq!(detail.content.title, "USD Exchange Rate");
        assert_eq!(detail.content.source.as_deref(), Some("EXCHANGE_RATE"));
        assert!(detail.id.is_none());
    }
}
