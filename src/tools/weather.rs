//! Current weather from OpenWeatherMap.

use crate::config::WeatherUnits;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weather summary handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub city: String,
    pub temperature: String,
    /// Passed through in the form the service sent it.
    pub pressure: serde_json::Value,
    pub humidity: serde_json::Value,
    pub condition: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    name: String,
    main: WeatherMain,
    weather: Vec<WeatherCondition>,
}

#[derive(Debug, Deserialize)]
struct WeatherMain {
    temp: f64,
    pressure: serde_json::Value,
    humidity: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    main: String,
    description: String,
}

impl WeatherResponse {
    fn into_report(self, units: WeatherUnits) -> WeatherReport {
        let (condition, description) = self
            .weather
            .into_iter()
            .next()
            .map(|w| (w.main, w.description))
            .unwrap_or_default();

        WeatherReport {
            city: self.name,
            temperature: format!("{}{}", self.main.temp, units.temperature_suffix()),
            pressure: self.main.pressure,
            humidity: self.main.humidity,
            condition,
            description,
        }
    }
}

/// Fetch the current weather for `city`, as JSON text or a descriptive error string.
pub async fn current_weather(
    http: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    units: WeatherUnits,
    city: &str,
) -> String {
    let Some(api_key) = api_key else {
        return "Error: No weather API key configured (set OPEN_WEATHER_KEY).".to_string();
    };

    match fetch(http, url, api_key, units, city).await {
        Ok(Some(report)) => serde_json::to_string(&report)
            .unwrap_or_else(|e| format!("An error occurred: {}", e)),
        Ok(None) => "Error: Unable to fetch data.".to_string(),
        Err(e) => format!("An error occurred: {}", e),
    }
}

async fn fetch(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    units: WeatherUnits,
    city: &str,
) -> Result<Option<WeatherReport>, reqwest::Error> {
    let units_param = units.to_string();
    let response = http
        .get(url)
        .query(&[("q", city), ("appid", api_key), ("units", units_param.as_str())])
        .send()
        .await?;

    if !response.status().is_success() {
        debug!("Weather lookup for {} failed: {}", city, response.status());
        return Ok(None);
    }

    let body: WeatherResponse = response.json().await?;
    Ok(Some(body.into_report(units)))
}
