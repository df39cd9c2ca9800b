mod client;
mod models;

pub use client::{CatalogClient, CatalogError, ResolvedTrack, TrackResolver};
pub use models::{Album, AlbumRef, Artist, ArtistLine, ArtistRef, MediaVariant, Playlist, Song};
