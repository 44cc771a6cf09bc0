//! Widget configuration types
//!
//! Holds the per-session configuration for a weather widget instance: the
//! coordinates to fetch for, unit system, view granularity, and timezone.
//! Configuration is immutable for the lifetime of a scheduling session;
//! changing it means re-initializing the scheduler.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced when validating widget configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Latitude outside [-90, 90] or not a finite number
    #[error("Invalid latitude: {0} (must be a finite number in [-90, 90])")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not a finite number
    #[error("Invalid longitude: {0} (must be a finite number in [-180, 180])")]
    InvalidLongitude(f64),
}

/// A validated coordinate pair
///
/// Construction via [`Coordinates::new`] is the single validation point for
/// coordinates entering the core; a `Coordinates` value is always finite and
/// in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Validates and constructs a coordinate pair
    ///
    /// # Errors
    /// * `ConfigError::InvalidLatitude` if latitude is not finite or outside [-90, 90]
    /// * `ConfigError::InvalidLongitude` if longitude is not finite or outside [-180, 180]
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ConfigError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ConfigError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ConfigError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Unit system for temperature, wind speed, and precipitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    /// Stable lowercase form used inside cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// View granularity: compact shows current conditions only, detailed adds
/// the daily forecast block (sunrise/sunset, UV, rain probability, hi/lo)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
pub enum View {
    #[default]
    Compact,
    Detailed,
}

impl View {
    /// Stable lowercase form used inside cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Compact => "compact",
            View::Detailed => "detailed",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session widget configuration
///
/// Coordinates arrive unvalidated from the host (config file, CLI flags) and
/// are checked by the scheduler at initialization. When both are absent the
/// scheduler delegates to a location provider instead.
#[derive(Debug, Clone, Default)]
pub struct WidgetConfig {
    /// Explicit latitude, if configured
    pub latitude: Option<f64>,
    /// Explicit longitude, if configured
    pub longitude: Option<f64>,
    /// Human-readable location label shown by renderers
    pub label: Option<String>,
    /// Unit system for the fetched data
    pub units: Units,
    /// View granularity
    pub view: View,
    /// IANA timezone identifier; `None` means let the API resolve it
    pub timezone: Option<String>,
}

impl WidgetConfig {
    /// The timezone request parameter: the configured identifier or `"auto"`
    pub fn timezone_or_auto(&self) -> &str {
        self.timezone.as_deref().unwrap_or("auto")
    }
}
