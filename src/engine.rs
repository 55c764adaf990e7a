//! # Playlist Engine
//!
//! The session event loop. A [`PlaylistEngine`] is the single actor that
//! owns the context normalizer, the catalog, the selection strategy and the
//! debouncer. Everything else talks to it through an [`EngineHandle`] and
//! listens on the [`EngineEvent`] channel.
//!
//! ## Loop
//!
//! ```text
//! commands ──┐
//! speed ticks├──▶ normalizer ──▶ debouncer ──(quiet period)──▶ classify + select ──▶ events
//! resync ────┘
//! ```
//!
//! Every context mutation schedules a recomputation; only the last one
//! inside the quiet period produces a [`PlaylistUpdate`].

use crate::catalog::{Catalog, CatalogSource};
use crate::context::DriveContext;
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::normalizer::{ContextNormalizer, Status};
use crate::selection::{
    LocalCatalogStrategy, Playlist, PlaylistStrategy, RemoteCatalogStrategy, SelectionConfig,
};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;

const COMMAND_BUFFER: usize = 16;
const EVENT_BUFFER: usize = 32;

/// Requests accepted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    /// User-supplied context; leaves automatic mode.
    Manual(DriveContext),
    /// Re-acquire live data and re-arm automatic mode.
    Resync,
    Shutdown,
}

/// A freshly computed playlist together with its inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistUpdate {
    pub context: DriveContext,
    pub status: Status,
    pub playlist: Playlist,
}

/// Output of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Status(Status),
    Playlist(PlaylistUpdate),
}

/// Cloneable sender side of the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    async fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Playlist engine is not running"))
    }

    pub async fn set_manual(&self, context: DriveContext) -> Result<()> {
        self.send(EngineCommand::Manual(context)).await
    }

    pub async fn resync(&self) -> Result<()> {
        self.send(EngineCommand::Resync).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(EngineCommand::Shutdown).await
    }

    /// Whether the engine loop has exited.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Runtime knobs for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub debounce: Duration,
    /// Run one live acquisition at startup.
    pub auto_sync: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            auto_sync: true,
        }
    }
}

/// Strategy matching where the catalog came from.
#[must_use]
pub fn strategy_for(catalog: &Catalog, config: &SelectionConfig) -> Box<dyn PlaylistStrategy> {
    match catalog.source() {
        CatalogSource::Remote => Box::new(RemoteCatalogStrategy::new(config.clone())),
        CatalogSource::Seed | CatalogSource::File(_) => {
            Box::new(LocalCatalogStrategy::new(config.clone()))
        }
    }
}

/// One-shot recommendation without a running engine.
///
/// # Examples
///
/// ```
/// use adaptive_drive::catalog::Catalog;
/// use adaptive_drive::context::{DriveContext, Weather};
/// use adaptive_drive::engine::recommend;
/// use adaptive_drive::selection::SelectionConfig;
///
/// let context = DriveContext::new(120, 14, Weather::Clear).unwrap();
/// let playlist = recommend(&context, &Catalog::seed(), &SelectionConfig::default(), &mut rand::thread_rng());
/// assert_eq!(playlist.len(), 5);
/// ```
pub fn recommend<R: RngCore>(
    context: &DriveContext,
    catalog: &Catalog,
    config: &SelectionConfig,
    rng: &mut R,
) -> Playlist {
    strategy_for(catalog, config).build(context, catalog.tracks(), rng)
}

/// The session actor.
pub struct PlaylistEngine {
    normalizer: ContextNormalizer,
    catalog: Catalog,
    strategy: Box<dyn PlaylistStrategy>,
    debouncer: Debouncer<DriveContext>,
    rng: StdRng,
    settings: EngineSettings,
    commands: mpsc::Receiver<EngineCommand>,
    events: mpsc::Sender<EngineEvent>,
    last_status: Option<Status>,
}

impl PlaylistEngine {
    /// Build an engine plus its command handle and event stream.
    ///
    /// Nothing happens until [`PlaylistEngine::run`] is awaited.
    #[must_use]
    pub fn new(
        normalizer: ContextNormalizer,
        catalog: Catalog,
        selection: &SelectionConfig,
        settings: EngineSettings,
    ) -> (Self, EngineHandle, mpsc::Receiver<EngineEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let strategy = strategy_for(&catalog, selection);

        let engine = Self {
            normalizer,
            catalog,
            strategy,
            debouncer: Debouncer::new(settings.debounce),
            rng: StdRng::from_entropy(),
            settings,
            commands: command_rx,
            events: event_tx,
            last_status: None,
        };

        (engine, EngineHandle { commands: command_tx }, event_rx)
    }

    /// Use a fixed RNG, e.g. for reproducible playlists.
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Run until shutdown, all handles dropped, or the event consumer goes
    /// away. The position subscription is cancelled on exit.
    pub async fn run(mut self) {
        info!(
            "Playlist engine started ({} tracks, debounce {:?})",
            self.catalog.len(),
            self.debouncer.delay()
        );

        let mut open = if self.settings.auto_sync {
            self.resync().await
        } else {
            let status = self.normalizer.status();
            self.publish_status(status).await
        };
        self.debouncer.schedule(self.normalizer.context());

        while open {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(EngineCommand::Manual(context)) => {
                        let context = self.normalizer.apply_manual(context);
                        open = self.publish_status(self.normalizer.status()).await;
                        self.debouncer.schedule(context);
                    }
                    Some(EngineCommand::Resync) => {
                        open = self.resync().await;
                    }
                    Some(EngineCommand::Shutdown) | None => {
                        debug!("Shutdown requested");
                        break;
                    }
                },
                tick = self.normalizer.next_tick() => {
                    if let Some(context) = self.normalizer.apply_speed_tick(tick) {
                        self.debouncer.schedule(context);
                    }
                }
                context = self.debouncer.fired() => {
                    open = self.recompute(context).await;
                }
            }
        }

        self.debouncer.cancel();
        self.normalizer.stop_watch();
        info!("Playlist engine stopped");
    }

    async fn resync(&mut self) -> bool {
        if !self.publish_status(Status::Syncing).await {
            return false;
        }
        let status = self.normalizer.resync().await;
        self.debouncer.schedule(self.normalizer.context());
        self.publish_status(status).await
    }

    async fn recompute(&mut self, context: DriveContext) -> bool {
        let playlist = self
            .strategy
            .build(&context, self.catalog.tracks(), &mut self.rng);
        debug!(
            "Recomputed playlist for {context}: {} tracks via {:?}",
            playlist.len(),
            playlist.path
        );

        let update = PlaylistUpdate {
            context,
            status: self.normalizer.status(),
            playlist,
        };
        self.emit(EngineEvent::Playlist(update)).await
    }

    async fn publish_status(&mut self, status: Status) -> bool {
        if self.last_status == Some(status) {
            return true;
        }
        self.last_status = Some(status);
        info!("Status: {status}");
        self.emit(EngineEvent::Status(status)).await
    }

    async fn emit(&self, event: EngineEvent) -> bool {
        if self.events.send(event).await.is_err() {
            warn!("Event consumer dropped, stopping engine");
            return false;
        }
        true
    }
}
