//! Context-aware playlists for drivers: speed, time of day and weather in,
//! an ordered playlist out.
//!
//! Core modules:
//! - [`context`] - The driving context and its validation
//! - [`classifier`] - Ordered rules mapping a context to preferred categories
//! - [`selection`] - Catalog filtering, fallback, shuffle and strategies
//! - [`engine`] - The session actor and one-shot [`engine::recommend`]
//!
//! ### Live Data
//!
//! - [`normalizer`] - Manual vs. automatic context, status tracking
//! - [`weather`] - Location, Open-Meteo lookups and the WMO mapping
//! - [`position`] - Continuous speed feed with cancellable subscriptions
//! - [`debounce`] - Coalescing of rapid context changes
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - Track records, the seed catalog and JSON catalogs
//! - [`spotify`] - Authorization-code login and playlist reads
//! - [`db`] - Token persistence (`SQLite` or in-memory)
//! - [`config`] - Settings file, environment overrides, data directories
//! - [`cli`] / [`completion`] / [`display`] - Command-line front end
//! - [`error`] - Adapter error taxonomy
//!
//! ## Quick Start Example
//!
//! ```
//! use adaptive_drive::catalog::Catalog;
//! use adaptive_drive::classifier::Rule;
//! use adaptive_drive::context::{DriveContext, Weather};
//! use adaptive_drive::engine::recommend;
//! use adaptive_drive::selection::SelectionConfig;
//!
//! let context = DriveContext::new(40, 22, Weather::Clear)?;
//! let playlist = recommend(&context, &Catalog::seed(), &SelectionConfig::default(), &mut rand::thread_rng());
//!
//! assert_eq!(playlist.rule, Some(Rule::NightRelax));
//! println!("Now playing: {:?}", playlist.now_playing().map(|t| &t.name));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Live Engine
//!
//! ```no_run
//! use adaptive_drive::catalog::Catalog;
//! use adaptive_drive::context::DriveContext;
//! use adaptive_drive::engine::{EngineEvent, EngineSettings, PlaylistEngine};
//! use adaptive_drive::normalizer::{ContextNormalizer, LiveSources};
//! use adaptive_drive::selection::SelectionConfig;
//!
//! # async fn demo() {
//! let normalizer = ContextNormalizer::new(DriveContext::default(), LiveSources::offline());
//! let (engine, handle, mut events) = PlaylistEngine::new(
//!     normalizer,
//!     Catalog::seed(),
//!     &SelectionConfig::default(),
//!     EngineSettings::default(),
//! );
//! tokio::spawn(engine.run());
//!
//! while let Some(event) = events.recv().await {
//!     if let EngineEvent::Playlist(update) = event {
//!         println!("{} tracks for {}", update.playlist.len(), update.context);
//!     }
//! }
//! # drop(handle);
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Adapters (weather, position feed, music service, token storage) return
//! [`error::ContextError`]. The normalizer turns acquisition failures into a
//! degraded status instead of propagating them; the classifier and selection
//! policy cannot fail. Application-level code uses `anyhow::Result`.

pub mod catalog;
pub mod classifier;
pub mod cli;
pub mod completion;
pub mod config;
pub mod context;
pub mod db;
pub mod debounce;
pub mod display;
pub mod engine;
pub mod error;
pub mod normalizer;
pub mod position;
pub mod selection;
pub mod spotify;
pub mod weather;
