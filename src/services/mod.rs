//! Third-party data providers, called from the server so keys stay here.

pub mod exchange_rate;
pub mod feed;
pub mod jobs;
pub mod news;
pub mod schemas;
pub mod snapshots;
pub mod weather;

use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderKeys;
use crate::registry::Source;

const USER_AGENT: &str = "telegazeta-api";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider rate limit reached, try again later")]
    RateLimited,
    #[error("provider request failed: {0}")]
    Status(StatusCode),
    #[error("provider request failed: {0}")]
    Http(reqwest::Error),
    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to decode provider response: {0}")]
    Decode(String),
    #[error("missing configuration field '{0}'")]
    MissingConfig(&'static str),
    #[error("{0} is not configured on the server")]
    MissingKey(&'static str),
}

// Provider keys travel in request URLs, so the URL never reaches the message.
impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        ProviderError::Http(error.without_url())
    }
}

impl ProviderError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited)
    }
}

/// Payload fetched for one page: an optional title override plus the
/// `additionalData` object handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderData {
    pub title: Option<String>,
    pub data: Value,
}

#[derive(Clone)]
pub struct Providers {
    client: Client,
    keys: ProviderKeys,
}

impl Providers {
    pub fn new(keys: ProviderKeys) -> Self {
        Self {
            client: Client::new(),
            keys,
        }
    }

    pub async fn fetch(&self, source: Source, config: &Value) -> Result<ProviderData, ProviderError> {
        debug!(%source, "fetching provider data");
        match source {
            Source::ExchangeRate => exchange_rate::fetch(&self.client, config).await,
            Source::Weather => weather::fetch(&self.client, config).await,
            Source::News => {
                let key = self
                    .keys
                    .news_api_key
                    .as_deref()
                    .ok_or(ProviderError::MissingKey("NEWS_API_KEY"))?;
                news::fetch(&self.client, key, config).await
            }
            Source::JobOffers => {
                let key = self
                    .keys
                    .jobs_api_key
                    .as_deref()
                    .ok_or(ProviderError::MissingKey("JOBS_API_KEY"))?;
                jobs::fetch(&self.client, key, config).await
            }
            Source::SportTable
            | Source::SportMatches
            | Source::Lottery
            | Source::Horoscope
            | Source::TvProgram => feed::fetch(&self.client, config).await,
        }
    }
}

pub(crate) fn config_str<'a>(config: &'a Value, field: &'static str) -> Result<&'a str, ProviderError> {
    config
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ProviderError::MissingConfig(field))
}

pub(crate) fn config_f64(config: &Value, field: &'static str) -> Result<f64, ProviderError> {
    config
        .get(field)
        .and_then(|value| value.as_f64().or_else(|| value.as_str()?.trim().parse().ok()))
        .ok_or(ProviderError::MissingConfig(field))
}

pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(host = response.url().host_str().unwrap_or_default(), "provider rate limited");
        return Err(ProviderError::RateLimited);
    }
    if !status.is_success() {
        return Err(ProviderError::Status(status));
    }
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|err| ProviderError::Decode(format!("{err}. body: {body}")))
}

pub(crate) async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, ProviderError> {
    let response = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .send()
        .await?;
    decode_response(response).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_helpers_read_strings_and_numbers() {
        let config = json!({ "city": " Gdańsk ", "latitude": 54.35, "longitude": "18.65", "empty": "" });
        assert_eq!(config_str(&config, "city").unwrap(), "Gdańsk");
        assert_eq!(config_f64(&config, "latitude").unwrap(), 54.35);
        assert_eq!(config_f64(&config, "longitude").unwrap(), 18.65);
        assert!(matches!(
            config_str(&config, "empty"),
            Err(ProviderError::MissingConfig("empty"))
        ));
    }

    #[tokio::test]
    async fn transport_errors_omit_the_request_url() {
        let url = Url::parse("http://127.0.0.1:1/api/1/news?apikey=NEWSSECRET123").unwrap();
        let err = get_json::<Value>(&Client::new(), url).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
        let message = err.to_string();
        assert!(!message.contains("NEWSSECRET123"), "{message}");
        assert!(!message.contains("127.0.0.1"), "{message}");
    }

    #[tokio::test]
    async fn missing_server_key_is_reported_before_any_request() {
        let providers = Providers::new(ProviderKeys::default());
        let err = providers.fetch(Source::News, &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "NEWS_API_KEY is not configured on the server");
    }
}
