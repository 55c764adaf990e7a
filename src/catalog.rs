//! # Track Catalog
//!
//! Immutable reference data for the selection policy. A catalog is built
//! once (static seed, JSON file, or a fetched remote library) and is only
//! read afterwards.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Cover art used when a source has none.
pub const PLACEHOLDER_COVER: &str = "https://picsum.photos/200";

/// Music genre/mood tag shared by classifier rules and catalog records.
///
/// Unknown labels are kept as [`Category::Other`] so catalogs can carry
/// tags the classifier does not know about yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Acoustic,
    Rock,
    Jazz,
    Pop,
    Electro,
    Chill,
    Classical,
    Slow,
    Other(String),
}

impl Category {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Category::Acoustic => "acoustic",
            Category::Rock => "rock",
            Category::Jazz => "jazz",
            Category::Pop => "pop",
            Category::Electro => "electro",
            Category::Chill => "chill",
            Category::Classical => "classical",
            Category::Slow => "slow",
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Ok(match label.as_str() {
            "acoustic" => Category::Acoustic,
            "rock" => Category::Rock,
            "jazz" => Category::Jazz,
            "pop" => Category::Pop,
            "electro" => Category::Electro,
            "chill" => Category::Chill,
            "classical" => Category::Classical,
            "slow" => Category::Slow,
            _ => Category::Other(label),
        })
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err("category label cannot be empty".to_string());
        }
        match value.parse() {
            Ok(category) => Ok(category),
            Err(never) => match never {},
        }
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// Audio features used for ranking. Sources without real analysis data get
/// the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub energy: f32,
    pub tempo: f32,
}

impl Default for AudioFeatures {
    fn default() -> Self {
        Self {
            energy: 0.5,
            tempo: 100.0,
        }
    }
}

/// A catalog record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub duration_secs: u32,
    pub category: Category,
    #[serde(default = "default_cover")]
    pub cover_art: String,
    /// Playable URI on the music service, when the track came from one.
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub features: AudioFeatures,
}

fn default_cover() -> String {
    PLACEHOLDER_COVER.to_string()
}

impl Track {
    /// `m:ss` rendering of the duration.
    #[must_use]
    pub fn duration_label(&self) -> String {
        format!("{}:{:02}", self.duration_secs / 60, self.duration_secs % 60)
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("track has an empty id");
        }
        if self.name.trim().is_empty() {
            bail!("track '{}' has an empty name", self.id);
        }
        if self.artist.trim().is_empty() {
            bail!("track '{}' has an empty artist", self.id);
        }
        if self.duration_secs == 0 {
            bail!("track '{}' has a zero duration", self.id);
        }
        Ok(())
    }
}

/// Where a catalog was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Seed,
    File(PathBuf),
    Remote,
}

/// Read-only collection of tracks for one session.
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    source: CatalogSource,
}

lazy_static::lazy_static! {
    /// Static seed catalog available at process start.
    static ref SEED_TRACKS: Vec<Track> = vec![
        seed_track("1", "Morning Coffee", "Jack Johnson style", 180, Category::Acoustic, 1025),
        seed_track("2", "Highway to Speed", "High Voltage", 210, Category::Rock, 146),
        seed_track("3", "Neon Lights", "Synthwave Boy", 240, Category::Electro, 160),
        seed_track("4", "Midnight Jazz", "The Sax Collective", 300, Category::Jazz, 453),
        seed_track("5", "Rainy Day Chill", "LoFi Beats", 150, Category::Chill, 304),
        seed_track("6", "Power Pop Anthem", "Stardust", 195, Category::Pop, 355),
        seed_track("7", "Heavy Foot", "Metal Core", 220, Category::Rock, 514),
        seed_track("8", "Soft Morning", "Acoustic Soul", 170, Category::Acoustic, 366),
        seed_track("9", "Night Drive", "Deep House 99", 260, Category::Electro, 603),
        seed_track("10", "Smooth Operator", "Jazz Trio", 280, Category::Jazz, 716),
        seed_track("11", "Focus Flow", "Ambient Works", 400, Category::Chill, 870),
    ];
}

fn seed_track(
    id: &str,
    name: &str,
    artist: &str,
    duration_secs: u32,
    category: Category,
    picture: u32,
) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artist: artist.to_string(),
        duration_secs,
        category,
        cover_art: format!("https://picsum.photos/id/{picture}/200/200"),
        uri: None,
        features: AudioFeatures::default(),
    }
}

impl Catalog {
    /// The built-in seed catalog.
    #[must_use]
    pub fn seed() -> Self {
        Self {
            tracks: SEED_TRACKS.clone(),
            source: CatalogSource::Seed,
        }
    }

    /// Wrap already-validated tracks, e.g. a fetched remote library.
    pub fn from_tracks(tracks: Vec<Track>, source: CatalogSource) -> Result<Self> {
        let mut seen = HashSet::new();
        for track in &tracks {
            track.validate()?;
            if !seen.insert(track.id.as_str()) {
                bail!("duplicate track id '{}' in catalog", track.id);
            }
        }
        debug!("Catalog built from {:?} with {} tracks", source, tracks.len());
        Ok(Self { tracks, source })
    }

    /// Load a JSON array of tracks.
    ///
    /// Missing `cover_art` falls back to a placeholder and missing
    /// `features` to [`AudioFeatures::default`].
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {}", path.display()))?;
        let tracks: Vec<Track> = serde_json::from_str(&raw)
            .with_context(|| format!("Catalog file {} is not a valid track list", path.display()))?;

        let catalog = Self::from_tracks(tracks, CatalogSource::File(path.to_path_buf()))
            .with_context(|| format!("Catalog file {} failed validation", path.display()))?;
        info!("Loaded {} tracks from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Seed catalog, or the JSON file when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::seed()),
        }
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}
