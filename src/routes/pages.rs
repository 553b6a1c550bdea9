use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    audit::{record_audit_event, AuditAction},
    auth::{internal_error, AuthenticatedAdmin},
    models::{page_number_text, CreatePageRequest, Page, PageType, Template, UpdatePageRequest},
    numbering::{self, CategoryCode, NumberingError},
    state::AppState,
};

pub(crate) const PAGE_COLUMNS: &str = r#"
    SELECT p.id,
           p.page_number,
           p.page_type,
           p.title,
           p.category,
           p.description,
           p.content,
           p.template_id,
           t.source,
           p.is_active,
           p.is_locked,
           p.created_at,
           p.updated_at
    FROM pages p
    LEFT JOIN templates t ON t.id = p.template_id
"#;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPagesQuery {
    pub include_inactive: Option<bool>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct NextNumberQuery {
    pub category: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextNumberResponse {
    pub category: Option<String>,
    pub start: i32,
    pub end: i32,
    pub next_number: i32,
}

pub(crate) async fn fetch_page_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Page>, sqlx::Error> {
    sqlx::query_as::<_, Page>(&format!("{PAGE_COLUMNS} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn fetch_active_page_by_number(
    pool: &PgPool,
    page_number: i32,
) -> Result<Option<Page>, sqlx::Error> {
    sqlx::query_as::<_, Page>(&format!(
        "{PAGE_COLUMNS} WHERE p.page_number = $1 AND p.is_active"
    ))
    .bind(page_number)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_template(pool: &PgPool, id: Uuid) -> Result<Option<Template>, sqlx::Error> {
    sqlx::query_as::<_, Template>(
        r#"
        SELECT id, name, source, category, config_json, is_active, created_at, updated_at
        FROM templates
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Every number taken in the namespace, inactive pages included.
async fn used_numbers(pool: &PgPool) -> Result<Vec<i32>, (StatusCode, String)> {
    sqlx::query_scalar::<_, i32>("SELECT page_number FROM pages")
        .fetch_all(pool)
        .await
        .map_err(internal_error)
}

pub(crate) fn numbering_rejection(error: NumberingError) -> (StatusCode, String) {
    let status = match error {
        NumberingError::Occupied(_) | NumberingError::Exhausted { .. } => StatusCode::CONFLICT,
        NumberingError::Invalid | NumberingError::OutOfRange { .. } => StatusCode::BAD_REQUEST,
    };
    (status, error.to_string())
}

fn parse_category(value: Option<&str>) -> Result<CategoryCode, (StatusCode, String)> {
    let value = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or((StatusCode::BAD_REQUEST, "Category is required".into()))?;
    CategoryCode::parse(value).ok_or((StatusCode::BAD_REQUEST, format!("Unknown category {value}")))
}

fn unique_violation(error: sqlx::Error, page_number: i32) -> (StatusCode, String) {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => (
            StatusCode::CONFLICT,
            NumberingError::Occupied(page_number).to_string(),
        ),
        _ => internal_error(error),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub async fn list_pages(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(params): Query<ListPagesQuery>,
) -> Result<Json<Vec<Page>>, (StatusCode, String)> {
    let include_inactive = params.include_inactive.unwrap_or(false);
    let category = params
        .category
        .as_deref()
        .and_then(CategoryCode::parse)
        .map(|code| code.as_str());
    let records = sqlx::query_as::<_, Page>(&format!(
        r#"{PAGE_COLUMNS}
        WHERE ($1 OR p.is_active)
          AND ($2::text IS NULL OR p.category = $2)
        ORDER BY p.page_number
        "#
    ))
    .bind(include_inactive)
    .bind(category)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(records))
}

pub async fn get_page(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(page_id): Path<Uuid>,
) -> Result<Json<Page>, (StatusCode, String)> {
    fetch_page_by_id(&state.pool, page_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))
}

pub async fn next_number(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(params): Query<NextNumberQuery>,
) -> Result<Json<NextNumberResponse>, (StatusCode, String)> {
    let category = params.category.unwrap_or_default();
    let numbers = used_numbers(&state.pool).await?;
    let range = numbering::range_for(&category);
    let next_number = numbering::allocate(&numbers, &category).map_err(numbering_rejection)?;

    Ok(Json(NextNumberResponse {
        category: CategoryCode::parse(&category).map(|code| code.as_str().to_string()),
        start: range.start,
        end: range.end,
        next_number,
    }))
}

pub async fn create_page(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(payload): Json<CreatePageRequest>,
) -> Result<Json<Page>, (StatusCode, String)> {
    let page_type = match payload.page_type.as_deref() {
        None => PageType::Manual,
        Some(value) => PageType::parse(value)
            .ok_or((StatusCode::BAD_REQUEST, format!("Unknown page type {value}")))?,
    };

    let (category, title, template_id, content) = match page_type {
        PageType::Manual => {
            let title = non_blank(payload.title)
                .ok_or((StatusCode::BAD_REQUEST, "Title is required".into()))?;
            let category = parse_category(payload.category.as_deref())?;
            (category, title, None, payload.content)
        }
        PageType::Template => {
            let template_id = payload
                .template_id
                .ok_or((StatusCode::BAD_REQUEST, "Template is required".into()))?;
            let template = fetch_template(&state.pool, template_id)
                .await
                .map_err(internal_error)?
                .ok_or((StatusCode::BAD_REQUEST, "Template not found".into()))?;
            if !template.is_active {
                return Err((StatusCode::BAD_REQUEST, "Template is not active".into()));
            }
            let category = parse_category(
                payload
                    .category
                    .as_deref()
                    .or(Some(template.category.as_str())),
            )?;
            let title = non_blank(payload.title).unwrap_or(template.name);
            (category, title, Some(template_id), None)
        }
    };

    let numbers = used_numbers(&state.pool).await?;
    let page_number = match payload.page_number.as_ref() {
        Some(value) => numbering::check_number(
            &numbers,
            category.as_str(),
            &page_number_text(value),
            None,
        ),
        None => numbering::allocate(&numbers, category.as_str()),
    }
    .map_err(numbering_rejection)?;

    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO pages (
            id, page_number, page_type, title, category, description, content, template_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(id)
    .bind(page_number)
    .bind(page_type.as_str())
    .bind(&title)
    .bind(category.as_str())
    .bind(non_blank(payload.description))
    .bind(content)
    .bind(template_id)
    .execute(&state.pool)
    .await
    .map_err(|error| unique_violation(error, page_number))?;

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::PageCreated,
        serde_json::json!({
            "page_id": id,
            "page_number": page_number,
            "type": page_type.as_str(),
        }),
    )
    .await;

    fetch_page_by_id(&state.pool, id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))
}

pub async fn update_page(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(page_id): Path<Uuid>,
    Json(payload): Json<UpdatePageRequest>,
) -> Result<Json<Page>, (StatusCode, String)> {
    let existing = fetch_page_by_id(&state.pool, page_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))?;

    let category = match payload.category.as_deref() {
        Some(value) => parse_category(Some(value))?,
        None => parse_category(Some(existing.category.as_str()))?,
    };
    let title = match payload.title {
        Some(title) => non_blank(Some(title))
            .ok_or((StatusCode::BAD_REQUEST, "Title is required".into()))?,
        None => existing.title.clone(),
    };

    let numbers = used_numbers(&state.pool).await?;
    let text = payload
        .page_number
        .as_ref()
        .map(page_number_text)
        .unwrap_or_else(|| existing.page_number.to_string());
    let page_number = numbering::check_number(
        &numbers,
        category.as_str(),
        &text,
        Some(existing.page_number),
    )
    .map_err(numbering_rejection)?;

    sqlx::query(
        r#"
        UPDATE pages
        SET page_number = $1,
            title = $2,
            category = $3,
            description = $4,
            content = $5,
            is_active = $6,
            updated_at = NOW()
        WHERE id = $7
        "#,
    )
    .bind(page_number)
    .bind(&title)
    .bind(category.as_str())
    .bind(payload.description.or(existing.description))
    .bind(payload.content.or(existing.content))
    .bind(payload.is_active.unwrap_or(existing.is_active))
    .bind(page_id)
    .execute(&state.pool)
    .await
    .map_err(|error| unique_violation(error, page_number))?;

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::PageUpdated,
        serde_json::json!({ "page_id": page_id, "page_number": page_number }),
    )
    .await;

    fetch_page_by_id(&state.pool, page_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))
}

pub async fn delete_page(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(page_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let existing = fetch_page_by_id(&state.pool, page_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))?;

    if existing.is_locked {
        return Err((
            StatusCode::FORBIDDEN,
            format!("Page {} is protected and cannot be deleted", existing.page_number),
        ));
    }

    sqlx::query("DELETE FROM pages WHERE id = $1")
        .bind(page_id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::PageDeleted,
        serde_json::json!({ "page_id": page_id, "page_number": existing.page_number }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_page(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(page_id): Path<Uuid>,
) -> Result<Json<Page>, (StatusCode, String)> {
    let result = sqlx::query(
        r#"
        UPDATE pages
        SET is_active = TRUE,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(page_id)
    .execute(&state.pool)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "Page not found".into()));
    }

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::PageActivated,
        serde_json::json!({ "page_id": page_id }),
    )
    .await;

    fetch_page_by_id(&state.pool, page_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Page not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbering_errors_map_to_statuses() {
        assert_eq!(
            numbering_rejection(NumberingError::Occupied(101)).0,
            StatusCode::CONFLICT
        );
        assert_eq!(numbering_rejection(NumberingError::Invalid).0, StatusCode::BAD_REQUEST);
        let (status, message) = numbering_rejection(NumberingError::Exhausted {
            category: "MISC".into(),
            range: CategoryCode::Misc.range(),
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "no free page numbers left in range 901-999 for category MISC");
    }

    #[test]
    fn category_must_be_known() {
        assert_eq!(parse_category(Some("sports")).unwrap(), CategoryCode::Sports);
        assert_eq!(parse_category(None).unwrap_err().1, "Category is required");
        assert_eq!(parse_category(Some("CURRENCY")).unwrap_err().1, "Unknown category CURRENCY");
    }
}
