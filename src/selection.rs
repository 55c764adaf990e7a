//! # Playlist Selection
//!
//! Turns classifier output into an ordered [`Playlist`]:
//!
//! 1. keep catalog tracks whose category is one of the preferred ones
//!    (membership only, preference order does not rank),
//! 2. fall back to a catalog prefix when nothing matched,
//! 3. shuffle uniformly (Fisher–Yates),
//! 4. truncate to the limit, if any.
//!
//! Strategies wrap the policy for the two catalog paths: the local catalog
//! (classify then select) and a streamed remote library (no genre data,
//! reshuffle on high speed, capped length).

use crate::catalog::{Category, Track};
use crate::classifier::{self, Rule};
use crate::context::DriveContext;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

/// Selection tuning.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Catalog prefix length used when no track matches.
    pub fallback_len: usize,
    /// Maximum playlist length for remote libraries.
    pub remote_limit: usize,
    /// Remote libraries are reshuffled above this speed (km/h).
    pub high_speed_threshold: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            fallback_len: 5,
            remote_limit: 10,
            high_speed_threshold: classifier::HIGH_SPEED_KMH,
        }
    }
}

/// Which branch of the policy produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPath {
    /// Tracks matched a preferred category.
    Matched,
    /// Nothing matched; a catalog prefix was used.
    Fallback,
    /// Remote library, kept in order.
    Remote,
    /// Remote library, reshuffled for high speed.
    RemoteShuffled,
}

/// Result of [`select`] with the path taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub tracks: Vec<Track>,
    pub path: SelectionPath,
}

/// Run the selection policy.
///
/// Non-empty whenever `catalog` is non-empty (and `limit` is not zero).
///
/// # Examples
///
/// ```
/// use adaptive_drive::catalog::{Catalog, Category};
/// use adaptive_drive::selection::{select, SelectionPath};
///
/// let catalog = Catalog::seed();
/// let selection = select(&[Category::Jazz], catalog.tracks(), None, 5, &mut rand::thread_rng());
/// assert_eq!(selection.path, SelectionPath::Matched);
/// assert!(selection.tracks.iter().all(|t| t.category == Category::Jazz));
/// ```
pub fn select<R: Rng + ?Sized>(
    preferred: &[Category],
    catalog: &[Track],
    limit: Option<usize>,
    fallback_len: usize,
    rng: &mut R,
) -> Selection {
    let mut tracks: Vec<Track> = catalog
        .iter()
        .filter(|track| preferred.contains(&track.category))
        .cloned()
        .collect();

    let path = if tracks.is_empty() {
        warn!(
            "No track matches [{}]; falling back to the first {} catalog tracks",
            join_labels(preferred),
            fallback_len
        );
        tracks = catalog.iter().take(fallback_len.max(1)).cloned().collect();
        SelectionPath::Fallback
    } else {
        SelectionPath::Matched
    };

    tracks.shuffle(rng);

    if let Some(limit) = limit {
        tracks.truncate(limit);
    }

    debug!("Selected {} tracks via {:?}", tracks.len(), path);
    Selection { tracks, path }
}

/// Ordered recommendation. The first track is "now playing".
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub tracks: Vec<Track>,
    /// Classifier rule behind this playlist, when one was applied.
    pub rule: Option<Rule>,
    pub path: SelectionPath,
}

impl Playlist {
    #[must_use]
    pub fn now_playing(&self) -> Option<&Track> {
        self.tracks.first()
    }

    #[must_use]
    pub fn up_next(&self) -> &[Track] {
        self.tracks.get(1..).unwrap_or(&[])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Playlist construction for one kind of catalog.
pub trait PlaylistStrategy: Send + Sync {
    /// Build a playlist for `context` from `catalog`.
    fn build(&self, context: &DriveContext, catalog: &[Track], rng: &mut dyn RngCore) -> Playlist;
}

/// Local catalog path: classify, select, no truncation.
#[derive(Debug, Clone, Default)]
pub struct LocalCatalogStrategy {
    config: SelectionConfig,
}

impl LocalCatalogStrategy {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }
}

impl PlaylistStrategy for LocalCatalogStrategy {
    fn build(&self, context: &DriveContext, catalog: &[Track], rng: &mut dyn RngCore) -> Playlist {
        let rule = Rule::matching(context);
        let preferred = classifier::classify(context);
        let selection = select(&preferred, catalog, None, self.config.fallback_len, rng);

        Playlist {
            tracks: selection.tracks,
            rule: Some(rule),
            path: selection.path,
        }
    }
}

/// Remote library path.
///
/// Fetched descriptors carry no genre and no real audio features, so the
/// library keeps its own order unless the car is going fast, in which case
/// it is reshuffled. Always capped at `remote_limit`.
#[derive(Debug, Clone, Default)]
pub struct RemoteCatalogStrategy {
    config: SelectionConfig,
}

impl RemoteCatalogStrategy {
    #[must_use]
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }
}

impl PlaylistStrategy for RemoteCatalogStrategy {
    fn build(&self, context: &DriveContext, catalog: &[Track], rng: &mut dyn RngCore) -> Playlist {
        let mut tracks = catalog.to_vec();

        let path = if context.speed() > self.config.high_speed_threshold {
            tracks.shuffle(rng);
            SelectionPath::RemoteShuffled
        } else {
            SelectionPath::Remote
        };
        tracks.truncate(self.config.remote_limit);

        debug!("Remote playlist: {} tracks via {:?}", tracks.len(), path);
        Playlist {
            tracks,
            rule: None,
            path,
        }
    }
}

fn join_labels(categories: &[Category]) -> String {
    categories
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
