//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `adaptive-drive` binary.
//!
//! ## Commands
//!
//! - `recommend`: one-shot playlist for a given context
//! - `classify`: show which rule fires and its categories
//! - `weather-code`: map a WMO code to a weather category
//! - `live`: run the engine with live weather and a speed feed
//! - `catalog`: list the catalog in use
//! - `spotify`: login, token exchange and playlist-based recommendations
//! - `completion`: shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! adaptive-drive recommend --speed 95 --hour 14 --weather clear
//! adaptive-drive live --speed-feed - < speeds.txt
//! adaptive-drive spotify recommend 37i9dQZF1DXcBWIGoYBM5M --speed 40 --hour 22 --weather rain
//! ```

use crate::context::{DriveContext, Weather};
use crate::error::ContextError;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "adaptive-drive")]
#[command(about = "AdaptiveDrive: playlists that follow your speed, the clock and the weather")]
#[command(version)]
pub struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// A complete driving context given on the command line.
#[derive(ClapArgs, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextArgs {
    /// Speed in km/h
    #[arg(long, default_value_t = 0)]
    pub speed: u32,

    /// Local hour, 0-23
    #[arg(long, default_value_t = 9, value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour: u8,

    /// Current weather
    #[arg(long, value_enum, default_value_t = WeatherArg::Clear)]
    pub weather: WeatherArg,
}

impl ContextArgs {
    pub fn to_context(self) -> Result<DriveContext, ContextError> {
        DriveContext::new(self.speed, self.hour, self.weather.into())
    }
}

/// Weather values accepted on the command line.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum WeatherArg {
    Clear,
    Cloudy,
    Rain,
    Snow,
}

impl From<WeatherArg> for Weather {
    fn from(arg: WeatherArg) -> Self {
        match arg {
            WeatherArg::Clear => Weather::Clear,
            WeatherArg::Cloudy => Weather::Cloudy,
            WeatherArg::Rain => Weather::Rain,
            WeatherArg::Snow => Weather::Snow,
        }
    }
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Recommend a playlist for a driving context
    ///
    /// Classifies the context, filters the catalog by the preferred
    /// categories and prints the shuffled result. The first track is the
    /// one that would play now.
    Recommend {
        #[command(flatten)]
        context: ContextArgs,

        /// Maximum number of tracks to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// JSON catalog to use instead of the built-in one
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        catalog: Option<PathBuf>,

        /// Seed the shuffle for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Show the rule and preferred categories for a context
    Classify {
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Map a WMO weather code to a weather category
    WeatherCode {
        /// WMO code as reported by the forecast service
        #[arg(allow_negative_numbers = true)]
        code: i32,
    },

    /// Run the live engine
    ///
    /// Acquires weather and local time once, then follows a speed feed (one
    /// m/s value per line) and prints every playlist update. Stops on
    /// Ctrl-C.
    Live {
        /// Speed feed file, or `-` for stdin
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        speed_feed: Option<String>,

        /// JSON catalog to use instead of the built-in one
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        catalog: Option<PathBuf>,

        /// Start in manual mode with SPEED,HOUR,WEATHER (e.g. `80,18,rain`)
        #[arg(long, value_parser = parse_context)]
        manual: Option<DriveContext>,
    },

    /// List the tracks of the catalog in use
    Catalog {
        /// JSON catalog to use instead of the built-in one
        #[arg(long, value_hint = clap::ValueHint::FilePath)]
        catalog: Option<PathBuf>,
    },

    /// Spotify session management and playlist-based recommendations
    Spotify {
        #[command(subcommand)]
        action: SpotifyAction,

        /// Keep the token in memory only
        #[arg(long, global = true)]
        no_persist: bool,
    },

    /// Generate shell completions
    ///
    /// Usage: adaptive-drive completion bash > ~/.local/share/bash-completion/completions/adaptive-drive
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Spotify actions
#[derive(Subcommand, Debug)]
pub enum SpotifyAction {
    /// Print the URL to open in a browser to grant access
    LoginUrl,

    /// Exchange the code from the redirect for an access token
    Exchange {
        /// `code` query parameter of the redirect
        code: String,
    },

    /// List your playlists
    Playlists,

    /// Recommend from one of your playlists
    Recommend {
        /// Playlist id
        playlist_id: String,

        #[command(flatten)]
        context: ContextArgs,
    },

    /// Forget the stored access token
    Logout,
}

fn parse_context(raw: &str) -> Result<DriveContext, String> {
    raw.parse::<DriveContext>().map_err(|e| e.to_string())
}
