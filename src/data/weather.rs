//! Open-Meteo weather API client
//!
//! This module fetches forecast data from the Open-Meteo API with a bounded
//! retry-with-backoff policy. A successful response that cannot be parsed, or
//! that lacks the `current` block, is treated the same as a transport failure
//! for retry purposes.

use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tracing::warn;

use super::{ForecastResponse, WeatherCondition};
use crate::config::{Coordinates, Units, View, WidgetConfig};

/// Base URL for the Open-Meteo API
const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current-condition fields requested on every fetch
const CURRENT_FIELDS: &str = "is_day,apparent_temperature,relative_humidity_2m,temperature_2m,precipitation,rain,weather_code,wind_gusts_10m,wind_speed_10m,wind_direction_10m";

/// Daily fields requested only for the detailed view
const DAILY_FIELDS: &str =
    "sunrise,sunset,uv_index_max,precipitation_probability_max,temperature_2m_max,temperature_2m_min";

/// Total fetch attempts before a failure is propagated
const MAX_FETCH_ATTEMPTS: u32 = 3;

/// Base delay of the exponential backoff between attempts (1s, then 2s)
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Weather API request failed with status {0}")]
    BadStatus(reqwest::StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Response parsed but carries no current-conditions block
    #[error("Invalid weather data received: missing current conditions")]
    MissingCurrent,
}

/// Client for fetching forecast data from the Open-Meteo API
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    /// Create a new WeatherClient against the public Open-Meteo endpoint
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: OPEN_METEO_BASE_URL.to_string(),
        }
    }

    /// Create a new WeatherClient with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Builds the forecast request URL for the given coordinates and config
    ///
    /// Unit selectors follow the configured unit system, the daily-fields
    /// parameter is present only for the detailed view, and the timezone
    /// parameter is always included (explicit identifier or `auto`).
    pub fn request_url(&self, coords: Coordinates, config: &WidgetConfig) -> String {
        let (temperature_unit, windspeed_unit) = match config.units {
            Units::Metric => ("celsius", "kmh"),
            Units::Imperial => ("fahrenheit", "mph"),
        };

        let mut url = format!(
            "{}?latitude={}&longitude={}&current={}&temperature_unit={}&windspeed_unit={}&precipitation_unit=mm",
            self.base_url,
            coords.latitude(),
            coords.longitude(),
            CURRENT_FIELDS,
            temperature_unit,
            windspeed_unit,
        );

        if config.view == View::Detailed {
            url.push_str("&daily=");
            url.push_str(DAILY_FIELDS);
        }

        url.push_str("&timezone=");
        url.push_str(config.timezone_or_auto());
        url
    }

    /// Performs a single fetch of the forecast
    ///
    /// # Errors
    /// * `WeatherError::RequestFailed` on transport failure
    /// * `WeatherError::BadStatus` on a non-success HTTP status
    /// * `WeatherError::ParseError` if the body is not valid JSON
    /// * `WeatherError::MissingCurrent` if the response lacks `current`
    pub async fn fetch(
        &self,
        coords: Coordinates,
        config: &WidgetConfig,
    ) -> Result<ForecastResponse, WeatherError> {
        let url = self.request_url(coords, config);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(WeatherError::BadStatus(response.status()));
        }

        let text = response.text().await?;
        let forecast: ForecastResponse = serde_json::from_str(&text)?;

        if forecast.current.is_none() {
            return Err(WeatherError::MissingCurrent);
        }

        Ok(forecast)
    }

    /// Fetches the forecast, retrying failed attempts with exponential backoff
    ///
    /// Makes at most 3 attempts with delays of 1s then 2s between them. Every
    /// failure class is retried alike; success is never retried. The last
    /// attempt's error is propagated.
    pub async fn fetch_with_retry(
        &self,
        coords: Coordinates,
        config: &WidgetConfig,
    ) -> Result<ForecastResponse, WeatherError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch(coords, config).await {
                Ok(forecast) => return Ok(forecast),
                Err(err) if attempt + 1 < MAX_FETCH_ATTEMPTS => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_secs = delay.as_secs(),
                        %err,
                        "weather fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Map WMO weather code to WeatherCondition enum
///
/// Weather codes from WMO (World Meteorological Organization):
/// - 0: Clear sky
/// - 1-3: Partly cloudy
/// - 45, 48: Fog
/// - 51-55: Drizzle
/// - 56-57: Freezing drizzle
/// - 61-65: Rain
/// - 66-67: Freezing rain
/// - 71-77: Snow
/// - 80-82: Rain showers
/// - 85-86: Snow showers
/// - 95-99: Thunderstorm
pub fn weather_code_to_condition(code: u8) -> WeatherCondition {
    match code {
        0 => WeatherCondition::Clear,
        1..=3 => WeatherCondition::PartlyCloudy,
        45 | 48 => WeatherCondition::Fog,
        51..=55 | 61..=65 | 80..=82 => WeatherCondition::Rain,
        56..=57 | 66..=67 => WeatherCondition::Showers,
        71..=77 | 85..=86 => WeatherCondition::Snow,
        95..=99 => WeatherCondition::Thunderstorm,
        _ => WeatherCondition::Cloudy, // Default for unknown codes
    }
}
