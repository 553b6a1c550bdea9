//! newsdata.io headlines.
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{get_json, ProviderData, ProviderError};

const NEWSDATA_URL: &str = "https://newsdata.io/api/1/news";

#[derive(Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsItem {
    title: Option<String>,
    #[serde(rename = "source_id")]
    source_id: Option<String>,
    pub_date: Option<String>,
    link: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: String,
    source: Option<String>,
    pub_date: Option<String>,
    link: Option<String>,
}

pub async fn fetch(client: &Client, api_key: &str, config: &Value) -> Result<ProviderData, ProviderError> {
    let option = |field: &str, default: &str| {
        config
            .get(field)
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(default)
            .to_string()
    };
    let mut params = vec![
        ("apikey", api_key.to_string()),
        ("language", option("language", "pl")),
        ("category", option("category", "top")),
    ];
    if let Some(country) = config.get("country").and_then(Value::as_str) {
        params.push(("country", country.to_string()));
    }
    let url = Url::parse_with_params(NEWSDATA_URL, &params)?;
    let payload: NewsResponse = get_json(client, url).await?;
    Ok(to_provider_data(payload))
}

fn to_provider_data(payload: NewsResponse) -> ProviderData {
    let articles: Vec<Article> = payload
        .results
        .into_iter()
        .filter_map(|item| {
            Some(Article {
                title: item.title?,
                source: item.source_id,
                pub_date: item.pub_date,
                link: item.link,
            })
        })
        .collect();
    ProviderData {
        title: None,
        data: serde_json::json!({ "articles": articles }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untitled_results_are_skipped() {
        let body = r#"{
            "status": "success",
            "results": [
                {"title": "Sejm przyjął ustawę", "source_id": "pap", "pubDate": "2024-05-01 10:00:00"},
                {"title": null, "source_id": "tvn24"}
            ]
        }"#;
        let payload: NewsResponse = serde_json::from_str(body).unwrap();
        let data = to_provider_data(payload);
        let articles = data.data["articles"].as_array().unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0]["source"], "pap");
    }
}
