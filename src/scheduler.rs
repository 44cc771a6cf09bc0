//! Fetch-and-refresh scheduler for the weather widget
//!
//! Owns the cache-or-fetch decision, the render handoff, and the background
//! refresh timing. After a load, the next refresh is aligned to when the
//! currently cached entry expires rather than a fixed interval from now; once
//! that one-shot fires, refreshes recur at the full TTL period. An entry that
//! is already stale at scheduling time arms nothing; the next explicit load
//! picks it up instead.
//!
//! Refresh tasks communicate shutdown over a channel rather than being
//! aborted, so an in-flight cycle always runs to completion before the task
//! observes its cancellation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::cache::{CacheKey, FreshnessCache};
use crate::config::{Coordinates, Units, WidgetConfig};
use crate::data::{ForecastResponse, WeatherClient};

/// Error message handed to the renderer when a fetch cycle is exhausted
const FETCH_FAILED_MESSAGE: &str = "Failed to load weather data";

/// Error message when no coordinates are configured and no provider exists
const NO_LOCATION_MESSAGE: &str =
    "Location not available. Please configure coordinates";

/// Floor for the one-shot refresh delay
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Consumes weather snapshots produced by the scheduler
///
/// The render handoff is the only side effect the core makes visible: a
/// snapshot with the session's units and config on success, or a message on
/// failure.
pub trait Renderer: Send + Sync {
    fn render(&self, forecast: &ForecastResponse, units: Units, config: &WidgetConfig);
    fn render_error(&self, message: &str);
}

/// Supplies coordinates when the configuration carries none
///
/// Resolution failures are fatal to initialization; the core's retry policy
/// does not cover location lookup.
pub trait LocationProvider: Send + Sync {
    fn resolve(&self) -> Result<Coordinates, LocationError>;
}

/// Error from a location provider
#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Unable to get your location: {0}")]
    Unavailable(String),
}

/// Lifecycle state of a widget instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetState {
    #[default]
    Uninitialized,
    Loading,
    Rendered,
    Errored,
}

/// Computes how long until the cached entry expires
///
/// `entry_time_ms` is the timestamp backing the last render, or `None` when
/// no load has succeeded. Returns `None` when the entry is already at or past
/// the TTL (the refresh is then deferred to the next explicit load), else the
/// remaining window clamped to at least one second.
pub fn refresh_delay(entry_time_ms: Option<i64>, now_ms: i64, ttl: Duration) -> Option<Duration> {
    let ttl_ms = ttl.as_millis() as i64;
    let age_ms = match entry_time_ms {
        Some(time) => (now_ms - time).max(0),
        None => ttl_ms,
    };

    if age_ms >= ttl_ms {
        return None;
    }

    Some(Duration::from_millis((ttl_ms - age_ms) as u64).max(MIN_REFRESH_DELAY))
}

/// Handle to a spawned refresh task
struct RefreshTimer {
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshTimer {
    /// Signals the task to stop after any in-flight cycle completes
    fn cancel(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

/// Shared widget state reachable from both the scheduler and its refresh task
struct WidgetInner {
    cache: FreshnessCache,
    client: WeatherClient,
    renderer: Arc<dyn Renderer>,
    config: WidgetConfig,
    coordinates: Mutex<Option<Coordinates>>,
    state: Mutex<WidgetState>,
    /// In-memory mirror of the entry backing the last render: (epoch-ms, payload)
    latest: Mutex<Option<(i64, ForecastResponse)>>,
}

impl WidgetInner {
    fn set_state(&self, state: WidgetState) {
        *self.state.lock().unwrap() = state;
    }

    fn fail(&self, message: &str) {
        self.set_state(WidgetState::Errored);
        self.renderer.render_error(message);
    }

    /// One load-and-render cycle: cache read, fetch on miss, render handoff
    ///
    /// Never propagates an error; an exhausted fetch renders the error path
    /// and leaves the next scheduled cycle unaffected.
    async fn run_cycle(&self) {
        let coords = match *self.coordinates.lock().unwrap() {
            Some(coords) => coords,
            None => return,
        };

        let key = CacheKey::new(coords, &self.config);
        let now = Utc::now();

        let (entry_time, payload) = match self.cache.read::<ForecastResponse>(&key, now) {
            Some(entry) => (entry.time, entry.data),
            None => match self.client.fetch_with_retry(coords, &self.config).await {
                Ok(forecast) => {
                    let fetched_at = Utc::now();
                    self.cache.write(&key, &forecast, fetched_at);
                    (fetched_at.timestamp_millis(), forecast)
                }
                Err(err) => {
                    error!(%err, "weather refresh cycle failed");
                    self.fail(FETCH_FAILED_MESSAGE);
                    return;
                }
            },
        };

        *self.latest.lock().unwrap() = Some((entry_time, payload.clone()));
        self.set_state(WidgetState::Rendered);
        self.renderer.render(&payload, self.config.units, &self.config);
    }
}

/// Orchestrates retrieval, rendering, and TTL-aligned background refresh for
/// one widget instance
///
/// At most one refresh task is live at a time; re-initialization cancels the
/// previous one before arming a new one. The scheduler is cheap to share: all
/// mutable state sits behind the inner `Arc`.
pub struct RefreshScheduler {
    inner: Arc<WidgetInner>,
    timer: Mutex<Option<RefreshTimer>>,
}

impl RefreshScheduler {
    /// Creates a scheduler over the injected cache, client, and renderer
    pub fn new(
        cache: FreshnessCache,
        client: WeatherClient,
        renderer: Arc<dyn Renderer>,
        config: WidgetConfig,
    ) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                cache,
                client,
                renderer,
                config,
                coordinates: Mutex::new(None),
                state: Mutex::new(WidgetState::Uninitialized),
                latest: Mutex::new(None),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WidgetState {
        *self.inner.state.lock().unwrap()
    }

    /// The snapshot backing the last successful render, if any
    pub fn latest_forecast(&self) -> Option<ForecastResponse> {
        self.inner
            .latest
            .lock()
            .unwrap()
            .as_ref()
            .map(|(_, forecast)| forecast.clone())
    }

    /// Whether a refresh task is currently armed
    pub fn refresh_armed(&self) -> bool {
        self.timer.lock().unwrap().is_some()
    }

    /// Validates coordinates, runs the first load, and arms the refresh
    ///
    /// Explicitly configured coordinates are validated here; invalid values
    /// terminate in the error-displayed state with no fetch and no timer.
    /// When the config carries no coordinates the `locator` collaborator is
    /// consulted once, with the same terminal handling on failure.
    pub async fn initialize(&self, locator: Option<&dyn LocationProvider>) {
        self.cancel_refresh();

        let config = &self.inner.config;
        let coords = match (config.latitude, config.longitude) {
            (Some(latitude), Some(longitude)) => match Coordinates::new(latitude, longitude) {
                Ok(coords) => coords,
                Err(err) => {
                    self.inner.fail(&err.to_string());
                    return;
                }
            },
            _ => match locator {
                Some(locator) => match locator.resolve() {
                    Ok(coords) => coords,
                    Err(err) => {
                        self.inner.fail(&err.to_string());
                        return;
                    }
                },
                None => {
                    self.inner.fail(NO_LOCATION_MESSAGE);
                    return;
                }
            },
        };

        *self.inner.coordinates.lock().unwrap() = Some(coords);
        self.inner.set_state(WidgetState::Loading);
        self.inner.run_cycle().await;

        let entry_time = self
            .inner
            .latest
            .lock()
            .unwrap()
            .as_ref()
            .map(|(time, _)| *time);
        match refresh_delay(entry_time, Utc::now().timestamp_millis(), self.inner.cache.ttl()) {
            Some(delay) => self.arm_refresh(delay),
            None => {
                debug!("cached entry already stale; refresh deferred to the next explicit load")
            }
        }
    }

    /// Runs one load-and-render cycle outside the timer (e.g. on page view)
    pub async fn load_and_render(&self) {
        self.inner.run_cycle().await;
    }

    /// Cancels the armed refresh task, if any
    ///
    /// An in-flight cycle still runs to completion; only subsequent firings
    /// are affected.
    pub fn cancel_refresh(&self) {
        // Also runs from Drop, so tolerate a poisoned lock
        if let Some(timer) = self.timer.lock().ok().and_then(|mut timer| timer.take()) {
            timer.cancel();
            debug!("cancelled armed refresh task");
        }
    }

    /// Spawns the refresh task: one-shot after `first_delay`, then recurring
    /// at the full TTL period
    fn arm_refresh(&self, first_delay: Duration) {
        let inner = Arc::clone(&self.inner);
        let ttl = inner.cache.ttl();
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        info!(
            first_delay_secs = first_delay.as_secs(),
            period_secs = ttl.as_secs(),
            "arming weather refresh"
        );

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(first_delay) => {}
                _ = shutdown_rx.recv() => return,
            }
            inner.run_cycle().await;

            let mut interval = tokio::time::interval(ttl);
            // Skip the first tick (immediate)
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        inner.run_cycle().await;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        let mut timer = self.timer.lock().unwrap();
        if let Some(previous) = timer.take() {
            previous.cancel();
        }
        *timer = Some(RefreshTimer { shutdown_tx });
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel_refresh();
    }
}
