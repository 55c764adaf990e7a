//! # Drive Context
//!
//! The canonical `(speed, time of day, weather)` triple the classifier
//! consumes. A `DriveContext` is always complete: live sources only ever
//! produce a [`PartialContext`], which is merged into an existing context.

use crate::error::ContextError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weather categories understood by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    #[default]
    Clear,
    Cloudy,
    Rain,
    Snow,
}

impl Weather {
    pub const ALL: [Weather; 4] = [Weather::Clear, Weather::Cloudy, Weather::Rain, Weather::Snow];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Cloudy => "cloudy",
            Weather::Rain => "rain",
            Weather::Snow => "snow",
        }
    }

    /// Fair weather for the morning rule.
    #[must_use]
    pub const fn is_fair(self) -> bool {
        matches!(self, Weather::Clear | Weather::Cloudy)
    }

    /// Precipitation for the cozy rule.
    #[must_use]
    pub const fn is_wet(self) -> bool {
        matches!(self, Weather::Rain | Weather::Snow)
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Weather {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clear" => Ok(Weather::Clear),
            "cloudy" => Ok(Weather::Cloudy),
            "rain" => Ok(Weather::Rain),
            "snow" => Ok(Weather::Snow),
            other => Err(ContextError::InvalidContext(format!(
                "unknown weather '{other}' (expected clear, cloudy, rain or snow)"
            ))),
        }
    }
}

/// Current driving conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DriveContext {
    /// km/h
    speed: u32,
    /// Local hour, 0..=23
    time_of_day: u8,
    weather: Weather,
}

impl Default for DriveContext {
    fn default() -> Self {
        Self {
            speed: 0,
            time_of_day: 9,
            weather: Weather::Clear,
        }
    }
}

impl DriveContext {
    /// Build a context, rejecting hours outside `0..=23`.
    pub fn new(speed: u32, time_of_day: u8, weather: Weather) -> Result<Self, ContextError> {
        validate_hour(time_of_day)?;
        Ok(Self {
            speed,
            time_of_day,
            weather,
        })
    }

    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.speed
    }

    #[must_use]
    pub const fn time_of_day(&self) -> u8 {
        self.time_of_day
    }

    #[must_use]
    pub const fn weather(&self) -> Weather {
        self.weather
    }

    #[must_use]
    pub const fn with_speed(self, speed: u32) -> Self {
        Self { speed, ..self }
    }

    pub fn with_time_of_day(self, time_of_day: u8) -> Result<Self, ContextError> {
        validate_hour(time_of_day)?;
        Ok(Self { time_of_day, ..self })
    }

    #[must_use]
    pub const fn with_weather(self, weather: Weather) -> Self {
        Self { weather, ..self }
    }

    /// Overwrite the fields present in `partial`. Speed is never touched.
    pub fn merge(self, partial: PartialContext) -> Result<Self, ContextError> {
        let mut merged = self;
        if let Some(weather) = partial.weather {
            merged = merged.with_weather(weather);
        }
        if let Some(hour) = partial.time_of_day {
            merged = merged.with_time_of_day(hour)?;
        }
        Ok(merged)
    }
}

impl fmt::Display for DriveContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} km/h, {:02}:00, {}",
            self.speed, self.time_of_day, self.weather
        )
    }
}

/// Accepts `SPEED,HOUR,WEATHER`, e.g. `95,14,clear`.
impl FromStr for DriveContext {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [speed, hour, weather] = parts.as_slice() else {
            return Err(ContextError::InvalidContext(format!(
                "expected SPEED,HOUR,WEATHER but got '{s}'"
            )));
        };

        let speed = speed
            .parse::<u32>()
            .map_err(|e| ContextError::InvalidContext(format!("bad speed '{speed}': {e}")))?;
        let hour = hour
            .parse::<u8>()
            .map_err(|e| ContextError::InvalidContext(format!("bad hour '{hour}': {e}")))?;

        DriveContext::new(speed, hour, weather.parse()?)
    }
}

/// Live-sourced update: weather and local hour, never speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartialContext {
    pub weather: Option<Weather>,
    pub time_of_day: Option<u8>,
}

fn validate_hour(hour: u8) -> Result<(), ContextError> {
    if hour > 23 {
        return Err(ContextError::InvalidContext(format!(
            "time of day must be within 0..=23, got {hour}"
        )));
    }
    Ok(())
}
