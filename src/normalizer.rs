//! # Context Normalizer
//!
//! Owns the canonical [`DriveContext`] and decides where it comes from:
//! manual input, or live signals (one-shot weather/time acquisition plus a
//! continuous speed feed).
//!
//! ```text
//! idle ──resync──▶ loading ──▶ success (auto mode, speed feed armed)
//!                          └─▶ error   (degraded, context unchanged)
//! any state ──manual edit──▶ manual (feed cancelled) ──resync──▶ loading
//! ```
//!
//! Adapter failures never escape: they become a [`Status`] and the last
//! known context stays in place.

use crate::context::DriveContext;
use crate::error::ContextError;
use crate::position::{speed_kmh, NoPositionSource, PositionSource, PositionTick, PositionWatch};
use crate::weather::{
    acquire_live_context, Clock, FixedLocation, LocalClock, LocationProvider, WeatherProvider,
};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;

/// Outcome of the last one-shot acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Loading,
    Success,
    Error,
}

/// User-facing status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Acquisition in flight.
    Syncing,
    /// Live data, speed feed armed.
    LiveAuto,
    /// User input drives the context.
    Manual,
    /// Last acquisition failed; running on stale or default data.
    Degraded,
}

impl Status {
    /// Three-state indicator: syncing, live-auto, manual/degraded.
    #[must_use]
    pub const fn indicator(self) -> &'static str {
        match self {
            Status::Syncing => "syncing",
            Status::LiveAuto => "live-auto",
            Status::Manual | Status::Degraded => "manual/degraded",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Syncing => "Syncing weather/GPS...",
            Status::LiveAuto => "Auto mode: live data",
            Status::Manual => "Manual mode",
            Status::Degraded => "Manual mode (live data unavailable)",
        };
        f.write_str(label)
    }
}

/// Live collaborators used by the normalizer.
#[derive(Clone)]
pub struct LiveSources {
    pub location: Arc<dyn LocationProvider>,
    pub weather: Arc<dyn WeatherProvider>,
    pub clock: Arc<dyn Clock>,
    pub positions: Arc<dyn PositionSource>,
}

impl LiveSources {
    /// Sources with no location and no position capability. Every resync
    /// degrades.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            location: Arc::new(FixedLocation(None)),
            weather: Arc::new(UnavailableWeather),
            clock: Arc::new(LocalClock),
            positions: Arc::new(NoPositionSource),
        }
    }
}

impl fmt::Debug for LiveSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSources").finish_non_exhaustive()
    }
}

struct UnavailableWeather;

#[async_trait]
impl WeatherProvider for UnavailableWeather {
    async fn current_weather_code(
        &self,
        _coords: crate::weather::Coordinates,
    ) -> Result<i32, ContextError> {
        Err(ContextError::AcquisitionFailure(
            "no weather provider configured".to_string(),
        ))
    }
}

/// Single owner of the canonical context.
#[derive(Debug)]
pub struct ContextNormalizer {
    context: DriveContext,
    sync_state: SyncState,
    auto_mode: bool,
    watch: Option<PositionWatch>,
    sources: LiveSources,
    last_error: Option<ContextError>,
}

impl ContextNormalizer {
    #[must_use]
    pub fn new(initial: DriveContext, sources: LiveSources) -> Self {
        Self {
            context: initial,
            sync_state: SyncState::Idle,
            auto_mode: false,
            watch: None,
            sources,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn context(&self) -> DriveContext {
        self.context
    }

    #[must_use]
    pub const fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    #[must_use]
    pub const fn is_auto(&self) -> bool {
        self.auto_mode
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// Failure behind a degraded status, if any.
    #[must_use]
    pub const fn last_error(&self) -> Option<&ContextError> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub const fn status(&self) -> Status {
        match (self.sync_state, self.auto_mode) {
            (SyncState::Loading, _) => Status::Syncing,
            (SyncState::Success, true) => Status::LiveAuto,
            (SyncState::Error, _) => Status::Degraded,
            _ => Status::Manual,
        }
    }

    /// Acquire weather and local hour, then arm automatic mode.
    ///
    /// On failure the context is left untouched and the status becomes
    /// [`Status::Degraded`]. Returns the resulting status.
    pub async fn resync(&mut self) -> Status {
        self.stop_watch();
        self.sync_state = SyncState::Loading;
        info!("Synchronizing live context");

        let acquired = acquire_live_context(
            self.sources.location.as_ref(),
            self.sources.weather.as_ref(),
            self.sources.clock.as_ref(),
        )
        .await
        .and_then(|partial| self.context.merge(partial));

        match acquired {
            Ok(merged) => {
                self.context = merged;
                self.sync_state = SyncState::Success;
                self.auto_mode = true;
                self.last_error = None;
                self.start_watch();
                info!("Live context armed: {}", self.context);
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Live context unavailable, keeping {}: {e}", self.context);
                } else {
                    error!("Live context rejected, keeping {}: {e}", self.context);
                }
                self.sync_state = SyncState::Error;
                self.auto_mode = false;
                self.last_error = Some(e);
            }
        }

        self.status()
    }

    /// Replace the context from user input and leave automatic mode.
    pub fn apply_manual(&mut self, context: DriveContext) -> DriveContext {
        if self.auto_mode {
            info!("Manual input received, leaving automatic mode");
        }
        self.auto_mode = false;
        self.stop_watch();
        self.context = context;
        self.context
    }

    /// Fold one speed tick into the context.
    ///
    /// Returns the new context when the speed changed. Failed ticks are
    /// dropped and ticks outside automatic mode are ignored.
    pub fn apply_speed_tick(&mut self, tick: PositionTick) -> Option<DriveContext> {
        if !self.auto_mode {
            debug!("Ignoring speed tick outside automatic mode");
            return None;
        }

        match tick {
            Ok(fix) => {
                let speed = speed_kmh(fix.speed_mps);
                if speed == self.context.speed() {
                    return None;
                }
                self.context = self.context.with_speed(speed);
                debug!("Speed update: {speed} km/h");
                Some(self.context)
            }
            Err(e) => {
                warn!("Dropping position tick: {e}");
                None
            }
        }
    }

    /// Next tick from the speed feed. Pending forever when no feed is armed.
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` loop.
    pub async fn next_tick(&mut self) -> PositionTick {
        loop {
            match self.watch.as_mut() {
                Some(watch) => match watch.ticks.recv().await {
                    Some(tick) => return tick,
                    None => {
                        info!("Speed feed ended");
                        self.stop_watch();
                    }
                },
                None => std::future::pending::<()>().await,
            }
        }
    }

    /// Cancel the speed feed, if armed.
    pub fn stop_watch(&mut self) {
        if let Some(mut watch) = self.watch.take() {
            watch.handle.cancel();
            debug!("Position watch {} stopped", watch.handle.id());
        }
    }

    fn start_watch(&mut self) {
        match self.sources.positions.watch() {
            Ok(watch) => {
                debug!("Position watch {} started", watch.handle.id());
                self.watch = Some(watch);
            }
            Err(e) => warn!("Continuous position unavailable, speed stays manual: {e}"),
        }
    }
}

impl Drop for ContextNormalizer {
    fn drop(&mut self) {
        self.stop_watch();
    }
}
