//! Core data models for the weather widget
//!
//! This module contains the normalized weather snapshot types exchanged with
//! the Open-Meteo API, cached by the freshness layer, and handed to renderers.

pub mod weather;

pub use weather::{weather_code_to_condition, WeatherClient, WeatherError};

use serde::{Deserialize, Serialize};

/// A raw forecast snapshot as returned by the weather API
///
/// This is the opaque payload the freshness cache persists and the renderer
/// consumes. `current` is required for a snapshot to be considered valid;
/// `daily` is only present when the detailed view was requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    /// Current conditions block
    pub current: Option<CurrentConditions>,
    /// Daily forecast block of parallel arrays (detailed view only)
    pub daily: Option<DailyForecast>,
    /// Timezone the API resolved for the coordinates
    pub timezone: Option<String>,
}

/// Current weather conditions at the requested coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Observation time in the response timezone, ISO 8601
    #[serde(default)]
    pub time: Option<String>,
    /// 1 during daylight, 0 at night
    #[serde(default)]
    pub is_day: Option<u8>,
    /// Air temperature in the requested unit
    pub temperature_2m: f64,
    /// Apparent ("feels like") temperature
    #[serde(default)]
    pub apparent_temperature: Option<f64>,
    /// Relative humidity percentage
    #[serde(default)]
    pub relative_humidity_2m: Option<f64>,
    /// Total precipitation in mm
    #[serde(default)]
    pub precipitation: Option<f64>,
    /// Rain in mm
    #[serde(default)]
    pub rain: Option<f64>,
    /// WMO weather interpretation code
    #[serde(default)]
    pub weather_code: Option<u8>,
    /// Wind speed in the requested unit
    #[serde(default)]
    pub wind_speed_10m: Option<f64>,
    /// Wind gust speed in the requested unit
    #[serde(default)]
    pub wind_gusts_10m: Option<f64>,
    /// Wind direction in degrees
    #[serde(default)]
    pub wind_direction_10m: Option<f64>,
}

/// Daily forecast values as parallel arrays, index 0 being today
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DailyForecast {
    #[serde(default)]
    pub sunrise: Vec<String>,
    #[serde(default)]
    pub sunset: Vec<String>,
    #[serde(default)]
    pub uv_index_max: Vec<f64>,
    #[serde(default)]
    pub precipitation_probability_max: Vec<f64>,
    #[serde(default)]
    pub temperature_2m_max: Vec<f64>,
    #[serde(default)]
    pub temperature_2m_min: Vec<f64>,
}

/// Types of weather conditions, mapped from WMO weather codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Rain,
    Showers,
    Thunderstorm,
    Snow,
    Fog,
}

impl WeatherCondition {
    /// Human-readable description for plain-text renderers
    pub fn description(&self) -> &'static str {
        match self {
            WeatherCondition::Clear => "Clear sky",
            WeatherCondition::PartlyCloudy => "Partly cloudy",
            WeatherCondition::Cloudy => "Overcast",
            WeatherCondition::Rain => "Rain",
            WeatherCondition::Showers => "Showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::Snow => "Snow",
            WeatherCondition::Fog => "Fog",
        }
    }
}
