//! Jooble job search.
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{config_str, decode_response, ProviderData, ProviderError, USER_AGENT};

const JOOBLE_URL: &str = "https://jooble.org/api";
const MAX_JOBS: usize = 10;

#[derive(Deserialize)]
struct JoobleResponse {
    #[serde(default)]
    jobs: Vec<JoobleJob>,
}

#[derive(Deserialize)]
struct JoobleJob {
    title: String,
    company: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    link: Option<String>,
}

#[derive(Serialize)]
struct Job {
    title: String,
    company: Option<String>,
    location: Option<String>,
    salary: Option<String>,
    link: Option<String>,
}

pub async fn fetch(client: &Client, api_key: &str, config: &Value) -> Result<ProviderData, ProviderError> {
    let keywords = config_str(config, "keywords")?;
    let location = config.get("location").and_then(Value::as_str).unwrap_or("");
    let response = client
        .post(format!("{JOOBLE_URL}/{api_key}"))
        .header(header::USER_AGENT, USER_AGENT)
        .json(&serde_json::json!({ "keywords": keywords, "location": location }))
        .send()
        .await?;
    let payload: JoobleResponse = decode_response(response).await?;
    Ok(to_provider_data(payload))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn to_provider_data(payload: JoobleResponse) -> ProviderData {
    let jobs: Vec<Job> = payload
        .jobs
        .into_iter()
        .take(MAX_JOBS)
        .map(|job| Job {
            title: job.title.trim().to_string(),
            company: blank_to_none(job.company),
            location: blank_to_none(job.location),
            salary: blank_to_none(job.salary),
            link: job.link,
        })
        .collect();
    ProviderData {
        title: None,
        data: serde_json::json!({ "jobs": jobs }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_dropped() {
        let body = r#"{
            "totalCount": 2,
            "jobs": [
                {"title": " Rust developer ", "company": "Acme", "location": "Wrocław", "salary": ""},
                {"title": "Tester", "company": null}
            ]
        }"#;
        let payload: JoobleResponse = serde_json::from_str(body).unwrap();
        let data = to_provider_data(payload);
        assert_eq!(data.data["jobs"][0]["title"], "Rust developer");
        assert!(data.data["jobs"][0]["salary"].is_null());
        assert_eq!(data.data["jobs"].as_array().unwrap().len(), 2);
    }
}
