//! # AdaptiveDrive
//!
//! Command-line front end: one-shot recommendations, the live engine and
//! the Spotify session.
//!
//! ## Usage
//!
//! ```bash
//! # One-shot recommendation
//! adaptive-drive recommend --speed 95 --hour 14 --weather clear
//!
//! # Live engine fed with m/s samples on stdin
//! adaptive-drive live --speed-feed -
//!
//! # Spotify
//! adaptive-drive spotify login-url
//! adaptive-drive spotify exchange <CODE>
//! adaptive-drive spotify recommend <PLAYLIST_ID> --speed 40 --hour 22 --weather rain
//! ```
//!
//! Logging is controlled with `RUST_LOG`, e.g.
//! `RUST_LOG=adaptive_drive=debug adaptive-drive live`.

use adaptive_drive::catalog::Catalog;
use adaptive_drive::cli::{self, ContextArgs, SpotifyAction};
use adaptive_drive::config::AppConfig;
use adaptive_drive::context::DriveContext;
use adaptive_drive::db::{MemoryTokenStore, SqliteTokenStore, TokenStore};
use adaptive_drive::engine::{self, EngineSettings, PlaylistEngine};
use adaptive_drive::normalizer::{ContextNormalizer, LiveSources};
use adaptive_drive::position::{
    FeedInput, LineFeedPositionSource, NoPositionSource, PositionSource,
};
use adaptive_drive::spotify::SpotifySession;
use adaptive_drive::weather::{weather_from_wmo, FixedLocation, LocalClock, OpenMeteoClient};
use adaptive_drive::{completion, display};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn rng_from(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

fn run_recommend(
    config: &AppConfig,
    context: ContextArgs,
    limit: Option<usize>,
    catalog: Option<&Path>,
    seed: Option<u64>,
) -> Result<()> {
    let context = context.to_context()?;
    let catalog = Catalog::load(catalog)?;

    let mut playlist = engine::recommend(&context, &catalog, &config.selection, &mut rng_from(seed));
    if let Some(limit) = limit {
        playlist.tracks.truncate(limit);
    }

    display::print_playlist(&context, &playlist);
    Ok(())
}

fn position_source(speed_feed: Option<&str>) -> Arc<dyn PositionSource> {
    match speed_feed {
        Some("-") => Arc::new(LineFeedPositionSource::new(FeedInput::Stdin)),
        Some(path) => Arc::new(LineFeedPositionSource::new(FeedInput::File(PathBuf::from(
            path,
        )))),
        None => Arc::new(NoPositionSource),
    }
}

async fn run_live(
    config: &AppConfig,
    speed_feed: Option<&str>,
    catalog: Option<&Path>,
    manual: Option<DriveContext>,
) -> Result<()> {
    let catalog = Catalog::load(catalog)?;
    let weather = OpenMeteoClient::new(config.weather_url.clone(), config.weather_timeout())
        .context("Failed to set up the weather client")?;

    let sources = LiveSources {
        location: Arc::new(FixedLocation(config.location)),
        weather: Arc::new(weather),
        clock: Arc::new(LocalClock),
        positions: position_source(speed_feed),
    };
    let normalizer = ContextNormalizer::new(manual.unwrap_or_default(), sources);
    let settings = EngineSettings {
        debounce: config.debounce(),
        auto_sync: config.auto_sync && manual.is_none(),
    };

    let (engine, handle, mut events) =
        PlaylistEngine::new(normalizer, catalog, &config.selection, settings);
    let task = tokio::spawn(engine.run());
    info!("Live engine running, Ctrl-C to stop");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => display::print_event(&event),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Cannot listen for Ctrl-C: {e}");
                }
                handle.shutdown().await?;
                break;
            }
        }
    }

    task.await.context("Playlist engine task failed")?;
    Ok(())
}

async fn run_spotify(config: &AppConfig, action: SpotifyAction, no_persist: bool) -> Result<()> {
    let store: Box<dyn TokenStore> = if no_persist {
        Box::new(MemoryTokenStore::new())
    } else {
        Box::new(SqliteTokenStore::open_default()?)
    };
    let mut session = SpotifySession::new(config.spotify.clone(), store)?;

    match action {
        SpotifyAction::LoginUrl => {
            if !config.spotify.has_credentials() {
                warn!("Spotify client id/secret are not configured");
            }
            println!("{}", session.authorize_url());
        }
        SpotifyAction::Exchange { code } => {
            session.exchange_code(&code).await?;
            println!("✅ Logged in to Spotify");
        }
        SpotifyAction::Playlists => {
            if !session.is_authenticated() {
                println!("Not logged in. Run `adaptive-drive spotify login-url` first.");
                return Ok(());
            }
            let playlists = session.user_playlists().await?;
            print!("{}", display::render_playlists(&playlists));
        }
        SpotifyAction::Recommend {
            playlist_id,
            context,
        } => {
            let context = context.to_context()?;
            let catalog = match session.fetch_remote_catalog(&playlist_id).await {
                Ok(catalog) if !catalog.is_empty() => catalog,
                Ok(_) => {
                    warn!("Playlist {playlist_id} has no playable tracks, using the built-in catalog");
                    Catalog::seed()
                }
                Err(e) => {
                    error!("Keeping the built-in catalog: {e}");
                    Catalog::seed()
                }
            };
            let playlist =
                engine::recommend(&context, &catalog, &config.selection, &mut rng_from(None));
            display::print_playlist(&context, &playlist);
        }
        SpotifyAction::Logout => {
            session.logout()?;
            println!("Logged out of Spotify");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        cli::Command::Recommend {
            context,
            limit,
            catalog,
            seed,
        } => run_recommend(&config, context, limit, catalog.as_deref(), seed)?,
        cli::Command::Classify { context } => {
            print!("{}", display::render_classification(&context.to_context()?));
        }
        cli::Command::WeatherCode { code } => {
            println!("{}", weather_from_wmo(code));
        }
        cli::Command::Live {
            speed_feed,
            catalog,
            manual,
        } => run_live(&config, speed_feed.as_deref(), catalog.as_deref(), manual).await?,
        cli::Command::Catalog { catalog } => {
            print!("{}", display::render_catalog(&Catalog::load(catalog.as_deref())?));
        }
        cli::Command::Spotify { action, no_persist } => {
            run_spotify(&config, action, no_persist).await?;
        }
        cli::Command::Completion { shell } => {
            completion::print_completions(shell, &mut cli::Args::command());
        }
    }

    Ok(())
}
