use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    numbering::CategoryCode,
    registry::{ContentRegistry, RegistryEntry},
    state::AppState,
};

#[derive(Deserialize)]
pub struct IntegrationsQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSummary {
    #[serde(flatten)]
    pub entry: RegistryEntry,
    /// Whether the viewer can render this source yet.
    pub renderable: bool,
}

impl From<&RegistryEntry> for IntegrationSummary {
    fn from(entry: &RegistryEntry) -> Self {
        Self {
            renderable: entry.handler().is_some(),
            entry: entry.clone(),
        }
    }
}

fn catalog(registry: &ContentRegistry, category: Option<&str>) -> Result<Vec<IntegrationSummary>, (StatusCode, String)> {
    let entries = match category {
        Some(value) => {
            let code = CategoryCode::parse(value)
                .ok_or((StatusCode::BAD_REQUEST, format!("Unknown category {value}")))?;
            registry.list_by_category(code)
        }
        None => {
            let mut entries: Vec<&RegistryEntry> = registry.entries().iter().collect();
            entries.sort_by_key(|entry| (entry.category.range().start, entry.page_number.unwrap_or(i32::MAX)));
            entries
        }
    };
    Ok(entries.into_iter().map(IntegrationSummary::from).collect())
}

pub async fn list_integrations(
    State(state): State<AppState>,
    Query(params): Query<IntegrationsQuery>,
) -> Result<Json<Vec<IntegrationSummary>>, (StatusCode, String)> {
    catalog(&state.registry, params.category.as_deref()).map(Json)
}
