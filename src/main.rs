//! hubweather - Current weather conditions with a TTL-bounded local cache
//!
//! Fetches current conditions for a coordinate from Open-Meteo, persists them
//! in the XDG cache directory, and (with --watch) keeps them refreshed on the
//! cache TTL schedule.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use directories::ProjectDirs;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hubweather::cache::{DiskStore, FreshnessCache, MemoryStore, StorageBackend};
use hubweather::cli::Cli;
use hubweather::config::{Units, WidgetConfig};
use hubweather::data::{
    weather_code_to_condition, CurrentConditions, ForecastResponse, WeatherClient,
};
use hubweather::scheduler::{RefreshScheduler, Renderer, WidgetState};

/// Maps wind direction degrees to compass text (e.g. NE)
fn deg_to_compass(deg: f64) -> &'static str {
    const DIRS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    DIRS[(deg / 22.5).round() as usize % 16]
}

/// Extracts the clock portion of an ISO 8601 timestamp ("2025-07-15T05:30")
fn clock_part(iso: &str) -> &str {
    iso.split('T').nth(1).unwrap_or(iso)
}

/// Renders forecasts as plain text on stdout, errors on stderr
struct TextRenderer;

impl TextRenderer {
    fn wind_line(current: &CurrentConditions, speed_unit: &str) -> String {
        let speed = current.wind_speed_10m.unwrap_or(0.0);
        let mut line = format!("{:.0} {}", speed, speed_unit);
        if let Some(dir) = current.wind_direction_10m {
            line.push(' ');
            line.push_str(deg_to_compass(dir));
        }
        if let Some(gusts) = current.wind_gusts_10m {
            if gusts > 0.0 {
                line.push_str(&format!(", gusts {:.0} {}", gusts, speed_unit));
            }
        }
        line
    }

    fn precipitation_label(current: &CurrentConditions) -> String {
        match current.rain.or(current.precipitation) {
            Some(amount) if amount > 0.0 => format!("{:.1} mm", amount),
            _ => "No rain".to_string(),
        }
    }
}

impl Renderer for TextRenderer {
    fn render(&self, forecast: &ForecastResponse, units: Units, config: &WidgetConfig) {
        let Some(current) = forecast.current.as_ref() else {
            return;
        };

        let (temp_unit, speed_unit) = match units {
            Units::Metric => ("°C", "km/h"),
            Units::Imperial => ("°F", "mph"),
        };

        if let Some(label) = config.label.as_deref().or(forecast.timezone.as_deref()) {
            println!("{}", label);
        }

        let condition = weather_code_to_condition(current.weather_code.unwrap_or(0));
        println!(
            "{:.0}{}  {}",
            current.temperature_2m,
            temp_unit,
            condition.description()
        );

        let feels_like = current
            .apparent_temperature
            .map(|t| format!("{:.0}{}", t, temp_unit))
            .unwrap_or_else(|| "—".to_string());
        let humidity = current
            .relative_humidity_2m
            .map(|h| format!("{:.0}%", h))
            .unwrap_or_else(|| "—".to_string());

        println!(
            "Feels like: {}   Wind: {}   Humidity: {}   Rain: {}",
            feels_like,
            Self::wind_line(current, speed_unit),
            humidity,
            Self::precipitation_label(current)
        );

        if let Some(daily) = forecast.daily.as_ref() {
            let high = daily
                .temperature_2m_max
                .first()
                .map(|t| format!("{:.0}{}", t, temp_unit))
                .unwrap_or_else(|| "—".to_string());
            let low = daily
                .temperature_2m_min
                .first()
                .map(|t| format!("{:.0}{}", t, temp_unit))
                .unwrap_or_else(|| "—".to_string());
            let sunrise = daily
                .sunrise
                .first()
                .map(|s| clock_part(s).to_string())
                .unwrap_or_else(|| "—".to_string());
            let sunset = daily
                .sunset
                .first()
                .map(|s| clock_part(s).to_string())
                .unwrap_or_else(|| "—".to_string());
            let uv = daily
                .uv_index_max
                .first()
                .map(|uv| format!("{:.1}", uv))
                .unwrap_or_else(|| "—".to_string());
            let rain_prob = daily
                .precipitation_probability_max
                .first()
                .map(|p| format!("{:.0}%", p))
                .unwrap_or_else(|| "—".to_string());

            println!(
                "Today: H {} / L {}   Sunrise {}   Sunset {}   UV {}   Rain {}",
                high, low, sunrise, sunset, uv, rain_prob
            );
        }

        if let Some(time) = current.time.as_deref() {
            println!("Last updated: {}", time.replace('T', " "));
        }
    }

    fn render_error(&self, message: &str) {
        eprintln!("Weather: {}", message);
    }
}

/// Opens the durable store, falling back to in-memory caching when no cache
/// directory can be determined
fn open_store(cache_dir: Option<std::path::PathBuf>) -> Arc<dyn StorageBackend> {
    let dir = cache_dir
        .or_else(|| ProjectDirs::from("", "", "hubweather").map(|d| d.cache_dir().to_path_buf()));

    match dir {
        Some(dir) => Arc::new(DiskStore::open(dir)),
        None => {
            warn!("no cache directory available; caching in memory only");
            Arc::new(MemoryStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match cli.widget_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::from(2);
        }
    };

    let cache = FreshnessCache::new(open_store(cli.cache_dir.clone()));
    let scheduler = RefreshScheduler::new(
        cache,
        WeatherClient::new(),
        Arc::new(TextRenderer),
        config,
    );

    // No location provider is wired up here: coordinates must come from flags
    scheduler.initialize(None).await;

    if scheduler.state() == WidgetState::Errored {
        return ExitCode::FAILURE;
    }

    if cli.watch {
        info!("watching; press Ctrl-C to exit");
        let _ = tokio::signal::ctrl_c().await;
        scheduler.cancel_refresh();
    }

    ExitCode::SUCCESS
}
