pub mod integrations;
pub mod pages;
pub mod public;
pub mod schemas;
pub mod stats;
pub mod templates;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{auth, state::AppState};

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/categories", get(public::list_categories))
        .route("/pages", get(public::list_pages))
        .route("/pages/{page_number}", get(public::get_page))
        .route("/pages/{page_number}/view", get(public::view_page))
        .route("/integrations", get(integrations::list_integrations));

    let admin = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/verify", get(auth::verify))
        .route("/pages", get(pages::list_pages).post(pages::create_page))
        .route("/pages/next-number", get(pages::next_number))
        .route(
            "/pages/{id}",
            get(pages::get_page)
                .put(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/pages/{id}/activate", patch(pages::activate_page))
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/templates/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/templates/{id}/activate", patch(templates::activate_template))
        .route("/schemas", get(schemas::list_schemas))
        .route("/schemas/{source}", get(schemas::get_schema))
        .route("/stats/pages", get(stats::page_stats));

    Router::new()
        .route("/health", get(health))
        .nest("/api/public", public)
        .nest("/api/admin", admin)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
