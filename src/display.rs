//! Terminal rendering for playlists, catalogs and engine events.
//!
//! Formatting lives in `render_*` functions returning `String` so it can be
//! tested; the `print_*` wrappers write to stdout.

use crate::catalog::{Catalog, Track};
use crate::classifier::Rule;
use crate::context::DriveContext;
use crate::engine::{EngineEvent, PlaylistUpdate};
use crate::normalizer::Status;
use crate::selection::{Playlist, SelectionPath};
use crate::spotify::PlaylistSummary;
use std::fmt;

fn track_line(track: &Track) -> String {
    format!(
        "{} - {} [{}] ({})",
        track.name,
        track.artist,
        track.category,
        track.duration_label()
    )
}

fn path_note(path: SelectionPath) -> Option<&'static str> {
    match path {
        SelectionPath::Matched | SelectionPath::Remote => None,
        SelectionPath::Fallback => Some("no track matched, showing the start of the catalog"),
        SelectionPath::RemoteShuffled => Some("reshuffled for high speed"),
    }
}

/// Now playing plus the queue.
struct PlaylistView<'a> {
    context: &'a DriveContext,
    playlist: &'a Playlist,
}

impl fmt::Display for PlaylistView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let playlist = self.playlist;
        writeln!(f, "🚗 Context: {}", self.context)?;
        if let Some(rule) = playlist.rule {
            writeln!(f, "🎯 Mood: {rule}")?;
        }
        if let Some(note) = path_note(playlist.path) {
            writeln!(f, "ℹ️  {note}")?;
        }
        writeln!(f)?;

        let Some(current) = playlist.now_playing() else {
            return writeln!(f, "⏸️  Nothing to play: the catalog is empty");
        };

        writeln!(f, "📀 Now Playing")?;
        writeln!(f, "═════════════")?;
        writeln!(f, "♫ {}", track_line(current))?;
        if let Some(uri) = &current.uri {
            writeln!(f, "🔗 {uri}")?;
        }

        if !playlist.up_next().is_empty() {
            writeln!(f)?;
            writeln!(f, "⏭️  Up Next")?;
            writeln!(f, "══════════")?;
            for (i, track) in playlist.up_next().iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, track_line(track))?;
            }
        }
        Ok(())
    }
}

#[must_use]
pub fn render_playlist(context: &DriveContext, playlist: &Playlist) -> String {
    PlaylistView { context, playlist }.to_string()
}

pub fn print_playlist(context: &DriveContext, playlist: &Playlist) {
    print!("{}", PlaylistView { context, playlist });
}

/// Rule and preferred categories for a context.
#[must_use]
pub fn render_classification(context: &DriveContext) -> String {
    let rule = Rule::matching(context);
    let categories = rule
        .categories()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("{context}\n{rule}: {categories}\n")
}

#[must_use]
pub fn render_catalog(catalog: &Catalog) -> String {
    let rows: String = catalog
        .iter()
        .map(|track| format!("  {:>3}  {}\n", track.id, track_line(track)))
        .collect();
    format!("🎵 {} tracks ({:?})\n{rows}", catalog.len(), catalog.source())
}

#[must_use]
pub fn render_playlists(playlists: &[PlaylistSummary]) -> String {
    if playlists.is_empty() {
        return "No playlists found\n".to_string();
    }
    playlists
        .iter()
        .map(|playlist| match playlist.track_count {
            Some(count) => format!("{}  {} ({count} tracks)\n", playlist.id, playlist.name),
            None => format!("{}  {}\n", playlist.id, playlist.name),
        })
        .collect()
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Syncing => "🔄",
        Status::LiveAuto => "📡",
        Status::Manual => "✋",
        Status::Degraded => "⚠️ ",
    }
}

#[must_use]
pub fn render_event(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Status(status) => format!("{} {status}\n", status_icon(*status)),
        EngineEvent::Playlist(PlaylistUpdate {
            context,
            status,
            playlist,
        }) => {
            format!(
                "\n[{}]\n{}",
                status.indicator(),
                render_playlist(context, playlist)
            )
        }
    }
}

pub fn print_event(event: &EngineEvent) {
    print!("{}", render_event(event));
}
