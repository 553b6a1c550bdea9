use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    auth::{internal_error, AuthenticatedAdmin},
    models::PageStat,
    state::AppState,
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub size: Option<i64>,
    pub page: Option<i64>,
    pub include_details: Option<bool>,
}

impl StatsQuery {
    /// `(limit, offset)` for a 1-based page of results.
    fn window(&self) -> (i64, i64) {
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = self.page.unwrap_or(1).max(1);
        (size, (page - 1).saturating_mul(size))
    }
}

pub async fn page_stats(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(params): Query<StatsQuery>,
) -> Result<Json<Vec<PageStat>>, (StatusCode, String)> {
    let (limit, offset) = params.window();
    let mut stats = sqlx::query_as::<_, PageStat>(
        r#"
        SELECT v.page_number, v.views, p.title, p.category
        FROM page_views v
        LEFT JOIN pages p ON p.page_number = v.page_number
        ORDER BY v.views DESC, v.page_number
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    if !params.include_details.unwrap_or(false) {
        for stat in &mut stats {
            stat.title = None;
            stat.category = None;
        }
    }

    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(size: Option<i64>, page: Option<i64>) -> StatsQuery {
        StatsQuery {
            size,
            page,
            include_details: None,
        }
    }

    #[test]
    fn window_defaults_and_clamps() {
        assert_eq!(query(None, None).window(), (10, 0));
        assert_eq!(query(Some(25), Some(3)).window(), (25, 50));
        assert_eq!(query(Some(0), Some(0)).window(), (1, 0));
        assert_eq!(query(Some(5000), None).window(), (100, 0));
    }

    #[test]
    fn huge_page_numbers_saturate_instead_of_overflowing() {
        let (limit, offset) = query(Some(100), Some(i64::MAX)).window();
        assert_eq!(limit, 100);
        assert_eq!(offset, i64::MAX);
        let (_, offset) = query(Some(10), Some(i64::MIN)).window();
        assert_eq!(offset, 0);
    }
}
