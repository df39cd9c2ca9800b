//! Typed views of the external catalog API's JSON payloads.
//!
//! The upstream service wraps everything in a `data` envelope and reports
//! images and audio as ladders of quality variants.

use serde::{Deserialize, Serialize};

/// One rung of an image or audio quality ladder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaVariant {
    pub quality: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ArtistLine {
    #[serde(default)]
    pub primary: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Vec<MediaVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AlbumRef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A playable song as the catalog reports it. The stream URL is not a
/// field of its own; it is picked from the download ladder on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Song {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub artists: ArtistLine,
    #[serde(default)]
    pub album: AlbumRef,
    #[serde(default)]
    pub image: Vec<MediaVariant>,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: Vec<MediaVariant>,
}

/// The download quality served for playback.
const PREFERRED_STREAM_QUALITY: &str = "160kbps";

impl Song {
    /// Picks the playable URL: the preferred quality when present,
    /// otherwise the highest rung of the ladder.
    pub fn stream_url(&self) -> Option<&str> {
        self.download_url
            .iter()
            .find(|variant| variant.quality == PREFERRED_STREAM_QUALITY)
            .or_else(|| self.download_url.last())
            .map(|variant| variant.url.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Vec<MediaVariant>,
    #[serde(rename = "topSongs", default)]
    pub top_songs: Vec<Song>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Vec<MediaVariant>,
    #[serde(default)]
    pub songs: Vec<Song>,
}

/// An editorial playlist owned by the catalog (not a user's self playlist).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Vec<MediaVariant>,
    #[serde(default)]
    pub songs: Vec<Song>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SongsEnvelope {
    #[serde(default)]
    pub data: Vec<Song>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchSongsEnvelope {
    pub data: SearchSongsResults,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct SearchSongsResults {
    #[serde(default)]
    pub results: Vec<Song>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistEnvelope {
    pub data: Artist,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumEnvelope {
    pub data: Album,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistEnvelope {
    pub data: Playlist,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SONG_JSON: &str = r#"{
        "id": "dZbDXCeu",
        "name": "Some Song",
        "type": "song",
        "duration": 213.0,
        "artists": {
            "primary": [
                {"id": "459320", "name": "Some Artist", "image": [{"quality": "50x50", "url": "http://img/50"}]}
            ]
        },
        "album": {"id": "25073105", "name": "Some Album"},
        "image": [
            {"quality": "50x50", "url": "http://img/50"},
            {"quality": "150x150", "url": "http://img/150"},
            {"quality": "500x500", "url": "http://img/500"}
        ],
        "downloadUrl": [
            {"quality": "12kbps", "url": "http://cdn/12"},
            {"quality": "48kbps", "url": "http://cdn/48"},
            {"quality": "96kbps", "url": "http://cdn/96"},
            {"quality": "160kbps", "url": "http://cdn/160"},
            {"quality": "320kbps", "url": "http://cdn/320"}
        ]
    }"#;

    #[test]
    fn parses_song_payload() {
        let song: Song = serde_json::from_str(SONG_JSON).unwrap();
        assert_eq!(song.id, "dZbDXCeu");
        assert_eq!(song.kind.as_deref(), Some("song"));
        assert_eq!(song.artists.primary.len(), 1);
        assert_eq!(song.artists.primary[0].name, "Some Artist");
        assert_eq!(song.album.name.as_deref(), Some("Some Album"));
        assert_eq!(song.image.len(), 3);
    }

    #[test]
    fn stream_url_prefers_160kbps() {
        let song: Song = serde_json::from_str(SONG_JSON).unwrap();
        assert_eq!(song.stream_url(), Some("http://cdn/160"));
    }

    #[test]
    fn stream_url_falls_back_to_highest_rung() {
        let mut song: Song = serde_json::from_str(SONG_JSON).unwrap();
        song.download_url.remove(3);
        assert_eq!(song.stream_url(), Some("http://cdn/320"));
    }

    #[test]
    fn stream_url_absent_on_empty_ladder() {
        let mut song: Song = serde_json::from_str(SONG_JSON).unwrap();
        song.download_url.clear();
        assert_eq!(song.stream_url(), None);
    }

    #[test]
    fn tolerates_minimal_song_payload() {
        let song: Song = serde_json::from_str(r#"{"id": "x1", "name": "Bare"}"#).unwrap();
        assert!(song.artists.primary.is_empty());
        assert!(song.album.id.is_none());
        assert!(song.stream_url().is_none());
    }
}
