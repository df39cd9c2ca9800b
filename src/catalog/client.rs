//! HTTP client for the external catalog service.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::models::{
    Album, AlbumEnvelope, Artist, ArtistEnvelope, Playlist, PlaylistEnvelope, SearchSongsEnvelope,
    Song, SongsEnvelope,
};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to reach the catalog service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Catalog request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error("Song {0} not found in catalog")]
    SongNotFound(String),
    #[error("No playable URL for song {0}")]
    MissingStreamUrl(String),
}

/// A song together with its resolved playable URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTrack {
    pub song: Song,
    pub stream_url: String,
}

/// The playback engine's view of the catalog: turn a track id into
/// something playable.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve_track(&self, track_id: &str) -> Result<ResolvedTrack, CatalogError>;
}

/// Client for the external song/search/artist API.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// # Arguments
    /// * `base_url` - Base URL of the catalog service (e.g., "https://catalog.example.com")
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: String, timeout_sec: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .expect("Failed to create HTTP client");

        let base_url = base_url.trim_end_matches('/').to_string();

        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, CatalogError> {
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Fetch a song by id.
    pub async fn get_song(&self, id: &str) -> Result<Song, CatalogError> {
        let url = format!("{}/api/songs/{}", self.base_url, id);
        let envelope: SongsEnvelope = self.get_json(url).await?;
        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::SongNotFound(id.to_owned()))
    }

    /// Fetch songs related to the given one, e.g. to extend a listening
    /// session past the end of a search result.
    pub async fn get_song_suggestions(
        &self,
        id: &str,
        limit: usize,
    ) -> Result<Vec<Song>, CatalogError> {
        let url = format!(
            "{}/api/songs/{}/suggestions?limit={}",
            self.base_url, id, limit
        );
        let envelope: SongsEnvelope = self.get_json(url).await?;
        Ok(envelope.data)
    }

    pub async fn search_songs(&self, query: &str, limit: usize) -> Result<Vec<Song>, CatalogError> {
        let url = format!(
            "{}/api/search/songs?query={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            limit
        );
        let envelope: SearchSongsEnvelope = self.get_json(url).await?;
        Ok(envelope.data.results)
    }

    pub async fn get_artist(&self, id: &str) -> Result<Artist, CatalogError> {
        let url = format!("{}/api/artists/{}", self.base_url, id);
        let envelope: ArtistEnvelope = self.get_json(url).await?;
        Ok(envelope.data)
    }

    /// Fetch an album with its embedded songs.
    pub async fn get_album(&self, id: &str) -> Result<Album, CatalogError> {
        let url = format!(
            "{}/api/albums?id={}",
            self.base_url,
            urlencoding::encode(id)
        );
        let envelope: AlbumEnvelope = self.get_json(url).await?;
        Ok(envelope.data)
    }

    /// Fetch an editorial playlist with its embedded songs.
    pub async fn get_playlist(&self, id: &str) -> Result<Playlist, CatalogError> {
        let url = format!(
            "{}/api/playlists?id={}",
            self.base_url,
            urlencoding::encode(id)
        );
        let envelope: PlaylistEnvelope = self.get_json(url).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl TrackResolver for CatalogClient {
    async fn resolve_track(&self, track_id: &str) -> Result<ResolvedTrack, CatalogError> {
        let song = self.get_song(track_id).await?;
        let stream_url = song
            .stream_url()
            .ok_or_else(|| CatalogError::MissingStreamUrl(track_id.to_owned()))?
            .to_owned();
        Ok(ResolvedTrack { song, stream_url })
    }
}
