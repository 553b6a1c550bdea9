//! Pass-through JSON feeds for sources without a public provider API
//! (league tables, fixtures, lottery draws, horoscope, TV schedules).
use reqwest::{Client, Url};
use serde_json::Value;

use super::{config_str, get_json, ProviderData, ProviderError};

pub async fn fetch(client: &Client, config: &Value) -> Result<ProviderData, ProviderError> {
    let url = Url::parse(config_str(config, "feedUrl")?)?;
    let payload: Value = get_json(client, url).await?;
    into_provider_data(payload)
}

fn into_provider_data(payload: Value) -> Result<ProviderData, ProviderError> {
    if !payload.is_object() {
        return Err(ProviderError::Decode("feed must return a JSON object".into()));
    }
    let title = payload
        .get("title")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(ProviderData { title, data: payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feed_must_be_an_object() {
        assert!(into_provider_data(json!([1, 2])).is_err());
        let data = into_provider_data(json!({ "title": "Lotto", "gameType": "Lotto" })).unwrap();
        assert_eq!(data.title.as_deref(), Some("Lotto"));
    }
}
