use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit::{record_audit_event, AuditAction},
    auth::{internal_error, AuthenticatedAdmin},
    models::{Page, Template, TemplateRequest},
    numbering::{self, CategoryCode},
    registry::Source,
    routes::pages::{fetch_template, PAGE_COLUMNS},
    services::schemas::{parse_config_text, schema_for, validate_config},
    state::AppState,
};

/// A validated template request in the shape it is stored.
#[derive(Debug, PartialEq)]
struct TemplateInput {
    name: String,
    source: Source,
    category: CategoryCode,
    config_json: Value,
}

fn validate_request(payload: TemplateRequest) -> Result<TemplateInput, (StatusCode, String)> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".into()));
    }
    let source = Source::from_tag(&payload.source).ok_or((
        StatusCode::BAD_REQUEST,
        format!("Unknown source {}", payload.source),
    ))?;
    let category = CategoryCode::parse(&payload.category).ok_or((
        StatusCode::BAD_REQUEST,
        format!("Unknown category {}", payload.category),
    ))?;

    // the admin editor may send the raw textarea contents
    let config_json = match payload.config_json {
        Value::String(text) => parse_config_text(&text),
        other => Ok(other),
    }
    .map_err(|error| (StatusCode::BAD_REQUEST, error.to_string()))?;
    validate_config(&schema_for(source), &config_json)
        .map_err(|error| (StatusCode::BAD_REQUEST, error.to_string()))?;

    Ok(TemplateInput {
        name,
        source,
        category,
        config_json,
    })
}

pub async fn list_templates(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
) -> Result<Json<Vec<Template>>, (StatusCode, String)> {
    let records = sqlx::query_as::<_, Template>(
        r#"
        SELECT id, name, source, category, config_json, is_active, created_at, updated_at
        FROM templates
        ORDER BY category, name
        "#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(records))
}

pub async fn get_template(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Path(template_id): Path<Uuid>,
) -> Result<Json<Template>, (StatusCode, String)> {
    fetch_template(&state.pool, template_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Template not found".into()))
}

pub async fn create_template(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Json(payload): Json<TemplateRequest>,
) -> Result<Json<Template>, (StatusCode, String)> {
    let input = validate_request(payload)?;
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO templates (id, name, source, category, config_json)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(&input.name)
    .bind(input.source.as_str())
    .bind(input.category.as_str())
    .bind(&input.config_json)
    .execute(&state.pool)
    .await
    .map_err(internal_error)?;

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::TemplateCreated,
        serde_json::json!({ "template_id": id, "source": input.source.as_str() }),
    )
    .await;

    fetch_template(&state.pool, id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Template not found".into()))
}

pub async fn update_template(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(template_id): Path<Uuid>,
    Json(payload): Json<TemplateRequest>,
) -> Result<Json<Template>, (StatusCode, String)> {
    let input = validate_request(payload)?;

    let mut tx = state.pool.begin().await.map_err(internal_error)?;
    let result = sqlx::query(
        r#"
        UPDATE templates
        SET name = $1,
            source = $2,
            category = $3,
            config_json = $4,
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(&input.name)
    .bind(input.source.as_str())
    .bind(input.category.as_str())
    .bind(&input.config_json)
    .bind(template_id)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "Template not found".into()));
    }

    // the cached payload was fetched with the old config
    sqlx::query("DELETE FROM template_snapshots WHERE template_id = $1")
        .bind(template_id)
        .execute(&mut *tx)
        .await
        .map_err(internal_error)?;
    tx.commit().await.map_err(internal_error)?;

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::TemplateUpdated,
        serde_json::json!({ "template_id": template_id }),
    )
    .await;

    fetch_template(&state.pool, template_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Template not found".into()))
}

fn in_use_message(pages: &[Page], template_id: Uuid) -> Option<String> {
    if !numbering::has_template_page(pages, template_id) {
        return None;
    }
    Some(match numbering::page_number_for_template(pages, template_id) {
        Some(number) => format!("Template is used by page {number}"),
        None => "Template is used by a page".to_string(),
    })
}

pub async fn delete_template(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(template_id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let pages = sqlx::query_as::<_, Page>(&format!("{PAGE_COLUMNS} WHERE p.template_id IS NOT NULL"))
        .fetch_all(&state.pool)
        .await
        .map_err(internal_error)?;
    if let Some(message) = in_use_message(&pages, template_id) {
        return Err((StatusCode::CONFLICT, message));
    }

    let result = sqlx::query("DELETE FROM templates WHERE id = $1")
        .bind(template_id)
        .execute(&state.pool)
        .await
        .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "Template not found".into()));
    }

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::TemplateDeleted,
        serde_json::json!({ "template_id": template_id }),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_template(
    State(state): State<AppState>,
    admin: AuthenticatedAdmin,
    Path(template_id): Path<Uuid>,
) -> Result<Json<Template>, (StatusCode, String)> {
    let result = sqlx::query(
        r#"
        UPDATE templates
        SET is_active = TRUE,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(template_id)
    .execute(&state.pool)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((StatusCode::NOT_FOUND, "Template not found".into()));
    }

    record_audit_event(
        &state.pool,
        Some(&admin.username),
        AuditAction::TemplateActivated,
        serde_json::json!({ "template_id": template_id }),
    )
    .await;

    fetch_template(&state.pool, template_id)
        .await
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Template not found".into()))
}
