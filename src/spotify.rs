//! # Spotify Session
//!
//! Authorization-code login, token persistence and playlist reads against
//! the Spotify Web API. The session is an explicit value: the token lives in
//! it and in the injected [`TokenStore`], never in a global.
//!
//! Fetched tracks carry no genre and no audio analysis, so they are tagged
//! [`Category::Other`]`("spotify")` with default features and go through the
//! remote selection strategy.

use crate::catalog::{AudioFeatures, Catalog, CatalogSource, Category, Track, PLACEHOLDER_COVER};
use crate::db::{TokenStore, ACCESS_TOKEN_KEY};
use crate::error::ContextError;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Permissions requested at login, joined with `%20`.
const SCOPES: [&str; 4] = [
    "user-read-private",
    "user-read-email",
    "playlist-read-private",
    "playlist-read-collaborative",
];

/// Tracks requested per playlist read.
const PLAYLIST_TRACK_LIMIT: u32 = 20;

/// Category tag for tracks from the music service.
pub const REMOTE_CATEGORY: &str = "spotify";

/// Client credentials and endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    pub timeout_ms: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:5173/callback".to_string(),
            auth_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base: "https://api.spotify.com".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl SpotifyConfig {
    /// Both client credentials are set.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// A playlist owned or followed by the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "tracks", deserialize_with = "track_total")]
    pub track_count: Option<u32>,
}

fn track_total<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Tracks {
        total: Option<u32>,
    }
    Ok(Option::<Tracks>::deserialize(deserializer)?.and_then(|t| t.total))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    track: Option<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ApiArtist>,
    uri: Option<String>,
    #[serde(default)]
    duration_ms: u64,
    album: Option<ApiAlbum>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    url: String,
}

impl ApiTrack {
    fn into_track(self) -> Option<Track> {
        let id = self.id.filter(|id| !id.trim().is_empty())?;
        if self.name.trim().is_empty() {
            return None;
        }
        let artist = self
            .artists
            .into_iter()
            .next()
            .map(|a| a.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "Unknown artist".to_string());
        let cover_art = self
            .album
            .and_then(|album| album.images.into_iter().next())
            .map_or_else(|| PLACEHOLDER_COVER.to_string(), |image| image.url);
        let duration_secs = u32::try_from(self.duration_ms / 1000).unwrap_or(u32::MAX).max(1);

        Some(Track {
            id,
            name: self.name,
            artist,
            duration_secs,
            category: Category::Other(REMOTE_CATEGORY.to_string()),
            cover_art,
            uri: self.uri,
            features: AudioFeatures::default(),
        })
    }
}

/// An authenticated (or not yet authenticated) music-service session.
pub struct SpotifySession<S: TokenStore> {
    config: SpotifyConfig,
    http: reqwest::Client,
    store: S,
    access_token: Option<String>,
}

impl<S: TokenStore> std::fmt::Debug for SpotifySession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotifySession")
            .field("client_id", &self.config.client_id)
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: TokenStore> SpotifySession<S> {
    /// Build a session, restoring any token already in `store`.
    ///
    /// # Errors
    ///
    /// [`ContextError::Storage`] when the store cannot be read, and
    /// [`ContextError::CatalogFetchFailure`] when the HTTP client cannot be
    /// built.
    pub fn new(config: SpotifyConfig, store: S) -> Result<Self, ContextError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ContextError::CatalogFetchFailure(format!("http client: {e}")))?;

        let access_token = store.get(ACCESS_TOKEN_KEY)?;
        if access_token.is_some() {
            debug!("Restored stored access token");
        }

        Ok(Self {
            config: SpotifyConfig {
                auth_url: config.auth_url.trim_end_matches('/').to_string(),
                api_base: config.api_base.trim_end_matches('/').to_string(),
                ..config
            },
            http,
            store,
            access_token,
        })
    }

    #[must_use]
    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Login URL the user must open to grant access.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&show_dialog=true",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            SCOPES.join("%20"),
        )
    }

    /// Trade an authorization code for an access token and persist it.
    ///
    /// # Errors
    ///
    /// [`ContextError::AuthExchangeFailure`] on transport errors, non-2xx
    /// answers or malformed payloads; the session stays unauthenticated.
    /// [`ContextError::Storage`] when the token cannot be persisted.
    pub async fn exchange_code(&mut self, code: &str) -> Result<(), ContextError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let result = async {
            let response = self
                .http
                .post(&self.config.token_url)
                .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
                .form(&params)
                .send()
                .await
                .map_err(|e| ContextError::AuthExchangeFailure(format!("token request: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ContextError::AuthExchangeFailure(format!(
                    "token endpoint returned {status}: {body}"
                )));
            }

            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| ContextError::AuthExchangeFailure(format!("token payload: {e}")))
        }
        .await;

        let token = match result {
            Ok(token) => token.access_token,
            Err(e) => {
                error!("Spotify authentication failed: {e}");
                return Err(e);
            }
        };

        self.store.set(ACCESS_TOKEN_KEY, &token)?;
        self.access_token = Some(token);
        info!("Spotify session authenticated");
        Ok(())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Forget the token, in memory and in the store.
    pub fn logout(&mut self) -> Result<(), ContextError> {
        self.access_token = None;
        self.store.clear(ACCESS_TOKEN_KEY)?;
        info!("Spotify session logged out");
        Ok(())
    }

    /// Playlists of the current user. Empty when not authenticated.
    pub async fn user_playlists(&self) -> Result<Vec<PlaylistSummary>, ContextError> {
        let Some(token) = self.access_token.as_deref() else {
            debug!("Not authenticated; no playlists");
            return Ok(Vec::new());
        };

        let url = format!("{}/v1/me/playlists", self.config.api_base);
        let page: Paging<PlaylistSummary> = self.get_json(&url, token, &[]).await?;
        debug!("Fetched {} playlists", page.items.len());
        Ok(page.items)
    }

    /// First tracks of a playlist as catalog records. Empty when not
    /// authenticated.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, ContextError> {
        let Some(token) = self.access_token.as_deref() else {
            debug!("Not authenticated; no playlist tracks");
            return Ok(Vec::new());
        };

        let url = format!(
            "{}/v1/playlists/{}/tracks",
            self.config.api_base,
            urlencoding::encode(playlist_id)
        );
        let limit = PLAYLIST_TRACK_LIMIT.to_string();
        let page: Paging<PlaylistItem> = self
            .get_json(&url, token, &[("limit", limit.as_str())])
            .await?;

        let total = page.items.len();
        let tracks: Vec<Track> = page
            .items
            .into_iter()
            .filter_map(|item| item.track)
            .filter_map(ApiTrack::into_track)
            .collect();
        if tracks.len() < total {
            debug!("Skipped {} unplayable playlist entries", total - tracks.len());
        }
        Ok(tracks)
    }

    /// Fetch a playlist as a remote catalog.
    ///
    /// Repeated tracks are kept once. Callers keep their current catalog when
    /// this fails.
    pub async fn fetch_remote_catalog(&self, playlist_id: &str) -> Result<Catalog, ContextError> {
        let tracks = self.playlist_tracks(playlist_id).await.map_err(|e| {
            error!("Failed to load playlist {playlist_id}: {e}");
            e
        })?;

        let mut seen = HashSet::new();
        let unique: Vec<Track> = tracks
            .into_iter()
            .filter(|track| {
                let fresh = seen.insert(track.id.clone());
                if !fresh {
                    warn!("Dropping repeated track {} from playlist", track.id);
                }
                fresh
            })
            .collect();

        let catalog = Catalog::from_tracks(unique, CatalogSource::Remote)
            .map_err(|e| ContextError::CatalogFetchFailure(format!("{e:#}")))?;
        info!("Loaded {} tracks from playlist {playlist_id}", catalog.len());
        Ok(catalog)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        token: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ContextError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| ContextError::CatalogFetchFailure(format!("request to {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContextError::CatalogFetchFailure(format!(
                "{url} returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ContextError::CatalogFetchFailure(format!("payload from {url}: {e}")))
    }
}
