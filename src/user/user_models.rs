//! User data models

use std::str::FromStr;
use std::time::SystemTime;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::auth::PasswordHasher;

/// Recent plays keep at most this many entries, most recent first.
pub const RECENT_PLAYS_CAP: usize = 20;

/// Length of the external-facing user id, distinct from the storage row id.
pub const PUBLIC_USER_ID_LEN: usize = 8;

/// Length of generated self-playlist ids.
pub const SELF_PLAYLIST_ID_LEN: usize = 16;

/// A full user row as stored. Never serialized to the wire directly;
/// the response shapes below carry the non-secret subsets.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: usize,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub hasher: PasswordHasher,
    pub verified: bool,
    /// Present only while the account is unverified.
    pub verification_token: Option<String>,
    pub photo_url: Option<String>,
    pub created: SystemTime,
}

impl UserAccount {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            user_id: self.public_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            photo_url: self.photo_url.clone(),
        }
    }

    pub fn public_profile(&self) -> PublicUserProfile {
        PublicUserProfile {
            user_id: self.public_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            verified: self.verified,
            photo_url: self.photo_url.clone(),
        }
    }
}

/// The identity subset returned alongside session tokens.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// What anyone may read about a user.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PublicUserProfile {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// The full record a user reads about themselves: everything except the
/// password hash and the verification token.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub recent_plays: Vec<String>,
    pub liked_songs: Vec<String>,
    pub library: Library,
    pub self_playlists: Vec<SelfPlaylist>,
}

/// Followed entities, one independent list per kind.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    pub artists: Vec<String>,
    pub albums: Vec<String>,
    pub playlists: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryKind {
    Artists,
    Albums,
    Playlists,
}

impl LibraryKind {
    pub fn to_int(&self) -> i32 {
        match self {
            LibraryKind::Artists => 1,
            LibraryKind::Albums => 2,
            LibraryKind::Playlists => 3,
        }
    }
}

impl FromStr for LibraryKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "artists" => Ok(LibraryKind::Artists),
            "albums" => Ok(LibraryKind::Albums),
            "playlists" => Ok(LibraryKind::Playlists),
            _ => bail!("Invalid library type"),
        }
    }
}

impl std::fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryKind::Artists => write!(f, "artists"),
            LibraryKind::Albums => write!(f, "albums"),
            LibraryKind::Playlists => write!(f, "playlists"),
        }
    }
}

/// A playlist created by the user, embedded in their record on the wire.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SelfPlaylist {
    pub playlist_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub songs: Vec<String>,
    pub created_at: u64,
}

/// Which way a presence toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}
