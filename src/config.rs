//! # Configuration Module
//!
//! Platform directories plus the application settings.
//!
//! ## Data Storage
//!
//! The token database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/adaptive-drive/state.db`
//! - macOS: `~/Library/Application Support/adaptive-drive/state.db`
//! - Windows: `%APPDATA%\adaptive-drive\state.db`
//!
//! ## Settings
//!
//! [`AppConfig`] is read from `<config_dir>/adaptive-drive/config.toml` when
//! the file exists, then overridden by `ADAPTIVE_DRIVE_*` environment
//! variables. Every field has a default, so an empty file is valid.

use crate::selection::SelectionConfig;
use crate::spotify::SpotifyConfig;
use crate::weather::Coordinates;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "adaptive-drive";

/// Prefix shared by all environment overrides.
pub const ENV_PREFIX: &str = "ADAPTIVE_DRIVE_";

/// Returns the application data directory, creating it if needed.
///
/// # Errors
///
/// Fails when the platform has no data directory or the directory cannot
/// be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the path of the state database (`state.db`).
///
/// # Examples
///
/// ```no_run
/// use adaptive_drive::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("state.db"))
}

/// Returns the default settings file path. The file itself is optional.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine system config directory."))?;
    Ok(config_dir.join(APP_DIR).join("config.toml"))
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Forecast service base URL.
    pub weather_url: String,
    pub weather_timeout_ms: u64,
    /// Fixed position used for weather lookups. Without one, live
    /// acquisition degrades to manual mode.
    pub location: Option<Coordinates>,
    /// Quiet period before a playlist is recomputed.
    pub debounce_ms: u64,
    /// Acquire live context at engine startup.
    pub auto_sync: bool,
    pub selection: SelectionConfig,
    pub spotify: SpotifyConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            weather_url: "https://api.open-meteo.com".to_string(),
            weather_timeout_ms: 5_000,
            location: None,
            debounce_ms: 400,
            auto_sync: true,
            selection: SelectionConfig::default(),
            spotify: SpotifyConfig::default(),
        }
    }
}

impl AppConfig {
    /// Settings from `path`, or from the default location when `None`.
    /// Environment overrides are applied last.
    ///
    /// An explicit path must exist; the default one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = get_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
            }
        };

        Ok(config.apply_env())
    }

    /// Parse a TOML settings file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `ADAPTIVE_DRIVE_*` overrides from the process environment.
    #[must_use]
    pub fn apply_env(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup, keyed by full variable name.
    /// Unparsable numbers are ignored with a warning.
    #[must_use]
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(val) = var("SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = val;
        }
        if let Some(val) = var("SPOTIFY_CLIENT_SECRET") {
            self.spotify.client_secret = val;
        }
        if let Some(val) = var("SPOTIFY_REDIRECT_URI") {
            self.spotify.redirect_uri = val;
        }
        if let Some(val) = var("WEATHER_URL") {
            self.weather_url = val;
        }
        if let Some(val) = var("DEBOUNCE_MS") {
            match val.parse() {
                Ok(ms) => self.debounce_ms = ms,
                Err(_) => warn!("Ignoring {ENV_PREFIX}DEBOUNCE_MS={val}: not a number"),
            }
        }

        let latitude = parse_degrees(var("LATITUDE"), "LATITUDE");
        let longitude = parse_degrees(var("LONGITUDE"), "LONGITUDE");
        match (latitude, longitude, self.location) {
            (Some(latitude), Some(longitude), _) => {
                self.location = Some(Coordinates {
                    latitude,
                    longitude,
                });
            }
            (Some(latitude), None, Some(current)) => {
                self.location = Some(Coordinates { latitude, ..current });
            }
            (None, Some(longitude), Some(current)) => {
                self.location = Some(Coordinates { longitude, ..current });
            }
            (None, None, _) => {}
            _ => warn!("Both {ENV_PREFIX}LATITUDE and {ENV_PREFIX}LONGITUDE are needed to set a location"),
        }

        self
    }

    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub const fn weather_timeout(&self) -> Duration {
        Duration::from_millis(self.weather_timeout_ms)
    }
}

fn parse_degrees(raw: Option<String>, name: &str) -> Option<f64> {
    let raw = raw?;
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            warn!("Ignoring {ENV_PREFIX}{name}={raw}: not a coordinate");
            None
        }
    }
}
