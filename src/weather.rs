//! # Location and Weather Acquisition
//!
//! One-shot live context: a position fix, a forecast lookup by coordinates
//! (Open-Meteo), the WMO code mapped to a [`Weather`], and the local hour.
//! Every failure along the way collapses into
//! [`ContextError::AcquisitionFailure`].

use crate::context::{PartialContext, Weather};
use crate::error::ContextError;
use async_trait::async_trait;
use chrono::Timelike;
use log::{debug, error, info};
use serde::Deserialize;
use std::time::Duration;

/// Map a WMO weather code to one of the four categories.
///
/// | code | weather |
/// |---|---|
/// | 0 | clear |
/// | 1–3, 45, 48 | cloudy |
/// | 51–67, 80–82, 95–99 | rain |
/// | 71–77, 85–86 | snow |
/// | anything else | clear |
#[must_use]
pub const fn weather_from_wmo(code: i32) -> Weather {
    match code {
        0 => Weather::Clear,
        1..=3 | 45 | 48 => Weather::Cloudy,
        51..=67 | 80..=82 => Weather::Rain,
        71..=77 | 85..=86 => Weather::Snow,
        // thunderstorms count as heavy rain
        95..=99 => Weather::Rain,
        _ => Weather::Clear,
    }
}

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One-shot position query.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, ContextError>;
}

/// Location configured up front. `None` means the platform has no
/// geolocation capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedLocation(pub Option<Coordinates>);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, ContextError> {
        self.0.ok_or_else(|| {
            ContextError::AcquisitionFailure("geolocation unsupported: no position configured".to_string())
        })
    }
}

/// Current weather by coordinates.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current WMO weather code at `coords`.
    async fn current_weather_code(&self, coords: Coordinates) -> Result<i32, ContextError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    weathercode: i32,
}

/// Open-Meteo forecast client.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenMeteoClient {
    /// Client against `base_url` (e.g. `https://api.open-meteo.com`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ContextError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContextError::AcquisitionFailure(format!("http client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current_weather_code(&self, coords: Coordinates) -> Result<i32, ContextError> {
        let url = format!("{}/v1/forecast", self.base_url);
        debug!(
            "Querying forecast for ({:.4}, {:.4})",
            coords.latitude, coords.longitude
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ContextError::AcquisitionFailure(format!("weather request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContextError::AcquisitionFailure(format!(
                "weather provider returned {status}"
            )));
        }

        let body: ForecastResponse = response
            .json()
            .await
            .map_err(|e| ContextError::AcquisitionFailure(format!("weather payload: {e}")))?;

        Ok(body.current_weather.weathercode)
    }
}

/// Source of the local wall-clock hour.
pub trait Clock: Send + Sync {
    fn local_hour(&self) -> u8;
}

/// System local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn local_hour(&self) -> u8 {
        // `hour()` is always < 24
        u8::try_from(chrono::Local::now().hour()).unwrap_or(0)
    }
}

/// Fixed hour, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u8);

impl Clock for FixedClock {
    fn local_hour(&self) -> u8 {
        self.0
    }
}

/// Acquire `{weather, time_of_day}` from live sources.
///
/// # Errors
///
/// [`ContextError::AcquisitionFailure`] when the position fix or the
/// forecast lookup fails.
pub async fn acquire_live_context(
    location: &dyn LocationProvider,
    weather: &dyn WeatherProvider,
    clock: &dyn Clock,
) -> Result<PartialContext, ContextError> {
    let result = async {
        let coords = location.current_position().await?;
        let code = weather.current_weather_code(coords).await?;
        Ok::<_, ContextError>(code)
    }
    .await;

    match result {
        Ok(code) => {
            let mapped = weather_from_wmo(code);
            let hour = clock.local_hour();
            info!("Live context: WMO code {code} -> {mapped}, local hour {hour}");
            Ok(PartialContext {
                weather: Some(mapped),
                time_of_day: Some(hour),
            })
        }
        Err(e) => {
            error!("Context auto-detection failed: {e}");
            Err(e)
        }
    }
}
