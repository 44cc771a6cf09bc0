//! Command-line interface parsing for the weather widget
//!
//! This module handles parsing of CLI arguments using clap and their
//! conversion into a [`WidgetConfig`]. Coordinate range validation is the
//! scheduler's job; the CLI only enforces that latitude and longitude arrive
//! as a pair.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::config::{Units, View, WidgetConfig};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// Only one of the two coordinate flags was given
    #[error("--latitude and --longitude must be provided together")]
    PartialCoordinates,
}

/// Home-hub weather widget: cached current conditions with scheduled refresh
#[derive(Parser, Debug)]
#[command(name = "hubweather")]
#[command(about = "Show current weather conditions with a TTL-bounded local cache")]
#[command(version)]
pub struct Cli {
    /// Latitude of the location to show weather for
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Longitude of the location to show weather for
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Location label printed above the conditions
    #[arg(long)]
    pub label: Option<String>,

    /// Unit system for temperature, wind, and precipitation
    #[arg(long, value_enum, default_value_t = Units::Metric)]
    pub units: Units,

    /// Compact shows current conditions; detailed adds today's forecast
    #[arg(long, value_enum, default_value_t = View::Compact)]
    pub view: View,

    /// IANA timezone identifier (defaults to API-side resolution)
    #[arg(long)]
    pub timezone: Option<String>,

    /// Keep running and refresh on the cache TTL schedule until Ctrl-C
    #[arg(long)]
    pub watch: bool,

    /// Directory for the persisted weather cache (defaults to the XDG cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

impl Cli {
    /// Builds the widget configuration from parsed arguments
    ///
    /// # Errors
    /// * `CliError::PartialCoordinates` if exactly one coordinate flag was given
    pub fn widget_config(&self) -> Result<WidgetConfig, CliError> {
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err(CliError::PartialCoordinates);
        }

        Ok(WidgetConfig {
            latitude: self.latitude,
            longitude: self.longitude,
            label: self.label.clone(),
            units: self.units,
            view: self.view,
            timezone: self.timezone.clone(),
        })
    }
}
