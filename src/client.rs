//! Typed HTTP client for the Telegazeta API, holding the admin session in a
//! [`SessionStore`].

use futures::future::join_all;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{AuthResponse, LoginRequest, VerifyResponse};
use crate::models::{
    page_number_text, CreatePageRequest, Page, PageDetail, PageStat, PageSummary, Template,
    TemplateRequest, UpdatePageRequest,
};
use crate::numbering::{self, CategoryCode, NumberingError};
use crate::registry::Source;
use crate::render::TeletextPage;
use crate::services::schemas::{parse_config_text, schema_for, validate_config, ConfigFieldError};
use crate::session::{Session, SessionError, SessionStore};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("session expired or missing; log in again")]
    Unauthorized,
    #[error("you are not permitted to perform this action")]
    Forbidden,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited by the data provider; try again later")]
    RateLimited,
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error(transparent)]
    Numbering(#[from] NumberingError),
    #[error(transparent)]
    Config(#[from] ConfigFieldError),
    #[error("session store: {0}")]
    Session(#[from] SessionError),
}

/// Maps a non-success response to the error the caller sees. The backend's
/// message is kept verbatim.
pub fn classify(status: StatusCode, body: &str) -> ClientError {
    let message = body.trim();
    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
        StatusCode::FORBIDDEN => ClientError::Forbidden,
        StatusCode::NOT_FOUND => ClientError::NotFound(message.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited,
        _ => ClientError::Backend {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                message.to_string()
            },
        },
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub original_name: String,
    pub category: String,
    pub description: String,
}

/// Response of the `/view` endpoint. `resolution` is kept as JSON; its
/// `state` tag is one of `manual`, `active`, `pending`, `unresolved`.
#[derive(Debug, Clone, Deserialize)]
pub struct PageView {
    pub resolution: Value,
    pub page: TeletextPage,
    pub warning: Option<String>,
}

impl PageView {
    pub fn state(&self) -> Option<&str> {
        self.resolution.get("state").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextNumber {
    pub category: Option<String>,
    pub start: i32,
    pub end: i32,
    pub next_number: i32,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("telegazeta/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    /// `TELEGAZETA_API_URL` or [`DEFAULT_API_URL`].
    pub fn from_env(store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let base_url = std::env::var("TELEGAZETA_API_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::new(base_url, store)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn current_session(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.store.load()?)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.store.load(), Ok(Some(_)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let error = classify(status, &body);
            if matches!(error, ClientError::Unauthorized) {
                self.store.clear()?;
            }
            if matches!(error, ClientError::RateLimited) {
                warn!("API reported rate limiting");
            }
            return Err(error);
        }
        // 204 responses have no body
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|err| ClientError::Decode(err.to_string()))
    }

    async fn public<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        debug!(path, "public request");
        self.send(self.http.get(self.url(path)).query(query)).await
    }

    /// Builds an authorized request. Without a stored token no request is made.
    fn admin(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let session = self.store.load()?.ok_or(ClientError::Unauthorized)?;
        debug!(%method, path, "admin request");
        Ok(self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::AUTHORIZATION, session.bearer()))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let request = self.http.post(self.url("/admin/auth/login")).json(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        });
        let auth: AuthResponse = self.send(request).await?;
        let session = Session::new(auth.token, auth.username);
        self.store.save(&session)?;
        Ok(session)
    }

    /// Revokes the token server-side when possible; the local session is
    /// cleared either way.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = match self.admin(Method::POST, "/admin/auth/logout") {
            Ok(request) => self.send::<Value>(request).await.map(|_| ()),
            Err(ClientError::Unauthorized) => Ok(()),
            Err(error) => Err(error),
        };
        self.store.clear()?;
        match result {
            Err(ClientError::Unauthorized) => Ok(()),
            other => other,
        }
    }

    pub async fn verify(&self) -> Result<VerifyResponse, ClientError> {
        self.send(self.admin(Method::GET, "/admin/auth/verify")?).await
    }

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.public("/public/categories", &[]).await
    }

    pub async fn pages_in_category(&self, category: CategoryCode) -> Result<Vec<PageSummary>, ClientError> {
        self.public("/public/pages", &[("category", category.as_str().to_string())])
            .await
    }

    /// Fetches every category concurrently. A failing category contributes no
    /// pages; the result is ordered by page number.
    pub async fn all_public_pages(&self) -> Vec<PageSummary> {
        let results = join_all(
            CategoryCode::ALL
                .into_iter()
                .map(|category| async move { (category, self.pages_in_category(category).await) }),
        )
        .await;

        let mut pages: Vec<PageSummary> = results
            .into_iter()
            .flat_map(|(category, result)| match result {
                Ok(pages) => pages,
                Err(error) => {
                    warn!(category = category.as_str(), %error, "failed to list category pages");
                    Vec::new()
                }
            })
            .collect();
        pages.sort_by_key(|page| page.page_number);
        pages
    }

    pub async fn page(&self, page_number: i32) -> Result<PageDetail, ClientError> {
        self.public(&format!("/public/pages/{page_number}"), &[]).await
    }

    pub async fn view(&self, page_number: i32) -> Result<PageView, ClientError> {
        self.public(&format!("/public/pages/{page_number}/view"), &[])
            .await
    }

    pub async fn admin_pages(&self, include_inactive: bool) -> Result<Vec<Page>, ClientError> {
        let mut request = self.admin(Method::GET, "/admin/pages")?;
        if include_inactive {
            request = request.query(&[("includeInactive", "true")]);
        }
        self.send(request).await
    }

    pub async fn next_number(&self, category: CategoryCode) -> Result<NextNumber, ClientError> {
        let request = self
            .admin(Method::GET, "/admin/pages/next-number")?
            .query(&[("category", category.as_str())]);
        self.send(request).await
    }

    /// Checks a supplied page number against the current pages before posting.
    pub async fn create_page(&self, payload: &CreatePageRequest) -> Result<Page, ClientError> {
        if let (Some(number), Some(category)) = (&payload.page_number, &payload.category) {
            let existing = self.admin_pages(true).await?;
            numbering::check_number(&existing, category, &page_number_text(number), None)?;
        }
        self.send(self.admin(Method::POST, "/admin/pages")?.json(payload))
            .await
    }

    pub async fn update_page(&self, id: Uuid, payload: &UpdatePageRequest) -> Result<Page, ClientError> {
        self.send(self.admin(Method::PUT, &format!("/admin/pages/{id}"))?.json(payload))
            .await
    }

    pub async fn delete_page(&self, id: Uuid) -> Result<(), ClientError> {
        self.send::<Value>(self.admin(Method::DELETE, &format!("/admin/pages/{id}"))?)
            .await
            .map(|_| ())
    }

    pub async fn templates(&self) -> Result<Vec<Template>, ClientError> {
        self.send(self.admin(Method::GET, "/admin/templates")?).await
    }

    /// Validates `configJson` against the source schema before posting.
    pub async fn create_template(&self, payload: &TemplateRequest) -> Result<Template, ClientError> {
        let body = TemplateRequest {
            name: payload.name.clone(),
            source: payload.source.clone(),
            category: payload.category.clone(),
            config_json: template_config(payload)?,
        };
        self.send(self.admin(Method::POST, "/admin/templates")?.json(&body))
            .await
    }

    pub async fn stats(&self, size: u32, page: u32, include_details: bool) -> Result<Vec<PageStat>, ClientError> {
        let request = self.admin(Method::GET, "/admin/stats/pages")?.query(&[
            ("size", size.to_string()),
            ("page", page.to_string()),
            ("includeDetails", include_details.to_string()),
        ]);
        self.send(request).await
    }
}

/// A config typed into a text field is parsed before it is checked.
fn template_config(payload: &TemplateRequest) -> Result<Value, ConfigFieldError> {
    let config = match &payload.config_json {
        Value::String(text) => parse_config_text(text)?,
        other => other.clone(),
    };
    if let Some(source) = Source::from_tag(&payload.source) {
        validate_config(&schema_for(source), &config)?;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9/api/", Arc::new(MemorySessionStore::new())).unwrap()
    }

    #[test]
    fn classify_maps_statuses() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, "Invalid token"),
            ClientError::Unauthorized
        ));
        assert!(matches!(classify(StatusCode::FORBIDDEN, ""), ClientError::Forbidden));
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ClientError::RateLimited
        ));
        match classify(StatusCode::CONFLICT, "page number 150 is already in use") {
            ClientError::Backend { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "page number 150 is already in use");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_backend_body_uses_reason_phrase() {
        let error = classify(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(error.to_string(), "Bad Gateway");
    }

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(client().url("/public/categories"), "http://127.0.0.1:9/api/public/categories");
    }

    #[tokio::test]
    async fn admin_calls_need_a_stored_token() {
        let client = client();
        assert!(!client.is_authenticated());
        assert!(matches!(client.verify().await, Err(ClientError::Unauthorized)));
    }

    #[tokio::test]
    async fn logout_without_session_is_a_no_op() {
        assert!(client().logout().await.is_ok());
    }

    #[tokio::test]
    async fn invalid_template_config_fails_before_any_request() {
        let store = Arc::new(MemorySessionStore::new());
        store.save(&Session::new("token", "admin")).unwrap();
        let client = ApiClient::new("http://127.0.0.1:9/api", store).unwrap();
        let payload = TemplateRequest {
            name: "Kursy".into(),
            source: "EXCHANGE_RATE".into(),
            category: "FINANCE".into(),
            config_json: json!({}),
        };
        assert!(matches!(
            client.create_template(&payload).await,
            Err(ClientError::Config(ConfigFieldError::Missing("currencyCode")))
        ));
    }

    #[test]
    fn text_template_config_is_parsed_then_checked() {
        let mut payload = TemplateRequest {
            name: "Kursy".into(),
            source: "EXCHANGE_RATE".into(),
            category: "FINANCE".into(),
            config_json: json!(r#"{"days": 5}"#),
        };
        assert!(matches!(
            template_config(&payload),
            Err(ConfigFieldError::Missing("currencyCode"))
        ));

        payload.config_json = json!(r#"{"currencyCode": "CHF"}"#);
        assert_eq!(template_config(&payload).unwrap(), json!({ "currencyCode": "CHF" }));

        payload.config_json = json!("{currencyCode");
        assert!(matches!(template_config(&payload), Err(ConfigFieldError::Malformed(_))));
    }

    #[test]
    fn page_view_exposes_state() {
        let view: PageView = serde_json::from_value(json!({
            "resolution": { "state": "pending", "pageNumber": 302 },
            "page": { "pageNumber": 302, "title": "Lotto Results", "lines": [] }
        }))
        .unwrap();
        assert_eq!(view.state(), Some("pending"));
        assert!(view.warning.is_none());
    }
}
