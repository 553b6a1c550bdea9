//! NBP (Narodowy Bank Polski) buy/sell rates, table C.
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{config_str, get_json, ProviderData, ProviderError};

const NBP_BASE_URL: &str = "https://api.nbp.pl/api/exchangerates/rates/c";
const DEFAULT_DAYS: u64 = 10;
const MAX_DAYS: u64 = 255;

#[derive(Deserialize)]
struct NbpResponse {
    currency: String,
    code: String,
    rates: Vec<NbpRate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NbpRate {
    effective_date: String,
    bid: f64,
    ask: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateRow {
    effective_date: String,
    bid: f64,
    ask: f64,
}

pub async fn fetch(client: &Client, config: &Value) -> Result<ProviderData, ProviderError> {
    let code = config_str(config, "currencyCode")?.to_lowercase();
    let days = config
        .get("days")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_DAYS)
        .clamp(1, MAX_DAYS);
    let url = Url::parse_with_params(
        &format!("{NBP_BASE_URL}/{code}/last/{days}/"),
        &[("format", "json")],
    )?;
    let payload: NbpResponse = get_json(client, url).await?;
    Ok(to_provider_data(payload))
}

fn to_provider_data(payload: NbpResponse) -> ProviderData {
    let rates: Vec<RateRow> = payload
        .rates
        .into_iter()
        .map(|rate| RateRow {
            effective_date: rate.effective_date,
            bid: rate.bid,
            ask: rate.ask,
        })
        .collect();
    ProviderData {
        title: Some(format!("{} exchange rate", payload.code)),
        data: serde_json::json!({
            "code": payload.code,
            "currency": payload.currency,
            "rates": rates,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Integration;

    #[test]
    fn nbp_payload_maps_to_renderable_data() {
        let body = r#"{
            "table": "C",
            "currency": "dolar amerykański",
            "code": "USD",
            "rates": [
                {"no": "082/C/NBP/2024", "effectiveDate": "2024-04-26", "bid": 3.9671, "ask": 4.0473},
                {"no": "083/C/NBP/2024", "effectiveDate": "2024-04-29", "bid": 3.9802, "ask": 4.0606}
            ]
        }"#;
        let payload: NbpResponse = serde_json::from_str(body).unwrap();
        let data = to_provider_data(payload);
        assert_eq!(data.title.as_deref(), Some("USD exchange rate"));
        assert_eq!(data.data["rates"][1]["effectiveDate"], "2024-04-29");
        let lines = Integration::ExchangeRate.render(&data.data).unwrap();
        assert!(lines[0].starts_with("USD"));
    }
}
