//! open-meteo daily forecast.
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{config_f64, config_str, get_json, ProviderData, ProviderError};

const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Deserialize)]
struct ForecastResponse {
    daily: DailyForecast,
}

#[derive(Deserialize)]
struct DailyForecast {
    time: Vec<String>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyWeather {
    date: String,
    max_temperature: f64,
    min_temperature: f64,
}

pub async fn fetch(client: &Client, config: &Value) -> Result<ProviderData, ProviderError> {
    let city = config_str(config, "city")?.to_string();
    let latitude = config_f64(config, "latitude")?;
    let longitude = config_f64(config, "longitude")?;
    let url = Url::parse_with_params(
        OPEN_METEO_URL,
        &[
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("daily", "temperature_2m_max,temperature_2m_min".to_string()),
            ("timezone", "auto".to_string()),
            ("forecast_days", "7".to_string()),
        ],
    )?;
    let payload: ForecastResponse = get_json(client, url).await?;
    Ok(to_provider_data(city, payload))
}

/// Days with a missing reading are dropped rather than rendered as zero.
fn to_provider_data(city: String, payload: ForecastResponse) -> ProviderData {
    let daily = payload.daily;
    let days: Vec<DailyWeather> = daily
        .time
        .into_iter()
        .zip(daily.temperature_2m_max)
        .zip(daily.temperature_2m_min)
        .filter_map(|((date, max), min)| {
            Some(DailyWeather {
                date,
                max_temperature: max?,
                min_temperature: min?,
            })
        })
        .collect();
    ProviderData {
        title: Some(format!("Weather {city}")),
        data: serde_json::json!({ "city": city, "dailyWeathers": days }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_zips_daily_columns() {
        let body = r#"{
            "latitude": 51.1,
            "longitude": 17.04,
            "daily": {
                "time": ["2024-05-01", "2024-05-02", "2024-05-03"],
                "temperature_2m_max": [21.4, null, 18.0],
                "temperature_2m_min": [9.1, 8.0, 7.5]
            }
        }"#;
        let payload: ForecastResponse = serde_json::from_str(body).unwrap();
        let data = to_provider_data("Wrocław".into(), payload);
        let days = data.data["dailyWeathers"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[1]["date"], "2024-05-03");
        assert_eq!(days[0]["maxTemperature"], 21.4);
        assert_eq!(data.title.as_deref(), Some("Weather Wrocław"));
    }
}
