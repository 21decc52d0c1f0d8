//! City lookup from the caller's network location.

use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    city: Option<String>,
}

/// Best-effort city name, or a descriptive error string.
pub async fn lookup_city(http: &reqwest::Client, url: &str) -> String {
    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(e) => return format!("An error occurred: {}", e),
    };

    if !response.status().is_success() {
        debug!("Geolocation lookup failed: {}", response.status());
        return "Error: Unable to fetch data.".to_string();
    }

    match response.json::<GeoResponse>().await {
        Ok(GeoResponse { city: Some(city) }) if !city.is_empty() => city,
        Ok(_) => "Error: Location lookup returned no city.".to_string(),
        Err(e) => format!("An error occurred: {}", e),
    }
}
