use crate::error::WeatherError;
use async_trait::async_trait;
use serde_json::Value;

/// Current conditions for a city.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentWeather {
    pub temp_c: f64,
    pub condition: String,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError>;
}

/// weatherapi.com `current.json` client.
pub struct WeatherApiClient {
    client: reqwest::Client,
    url: String,
}

impl WeatherApiClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: super::http_client(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiClient {
    async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather, WeatherError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("key", api_key), ("q", city)])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| WeatherError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| WeatherError::Transport(e.to_string()))?;
        let json: Value =
            serde_json::from_str(&body).map_err(|e| WeatherError::Malformed(e.to_string()))?;
        parse_current(&json)
    }
}

/// Pulls `current.temp_c` and `current.condition.text` out of a response body.
pub fn parse_current(json: &Value) -> Result<CurrentWeather, WeatherError> {
    let current = json
        .get("current")
        .ok_or_else(|| WeatherError::Malformed("missing 'current'".into()))?;
    let temp_c = current
        .get("temp_c")
        .and_then(Value::as_f64)
        .ok_or_else(|| WeatherError::Malformed("missing 'current.temp_c'".into()))?;
    let condition = current
        .get("condition")
        .and_then(|c| c.get("text"))
        .and_then(Value::as_str)
        .ok_or_else(|| WeatherError::Malformed("missing 'current.condition.text'".into()))?;

    Ok(CurrentWeather {
        temp_c,
        condition: condition.to_string(),
    })
}
