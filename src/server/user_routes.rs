//! Profile, recent plays, likes, library and self-playlist endpoints.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::user::{
    Library, LibraryKind, SelfPlaylist, ToggleOutcome, UserRecord, UserSummary,
};

use super::session::Session;
use super::state::{GuardedUserManager, ServerState};

/// Photo uploads are bounded before anything is persisted.
pub const MAX_PHOTO_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Deserialize, Debug)]
pub struct UpdateNameBody {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SongIdBody {
    #[serde(default)]
    pub song_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LibraryToggleBody {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreatePlaylistBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub msg: String,
    pub user: UserSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPlaysResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub recent_plays: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikedSongsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub liked_songs: Vec<String>,
}

#[derive(Serialize)]
pub struct LibraryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub library: Library,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfPlaylistsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub self_playlists: Vec<SelfPlaylist>,
}

#[derive(Serialize)]
pub struct PlaylistResponse {
    pub msg: String,
    pub playlist: SelfPlaylist,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoResponse {
    pub photo_url: String,
}

fn required(value: Option<String>, msg: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::validation(msg))
}

pub async fn get_me(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<UserRecord>, ApiError> {
    let record = user_manager
        .get_self_record(session.user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(record))
}

pub async fn get_public_user(
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<String>,
) -> Result<Json<crate::user::PublicUserProfile>, ApiError> {
    let account = user_manager
        .get_user_by_public_id(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(account.public_profile()))
}

pub async fn get_user_photo(
    State(user_manager): State<GuardedUserManager>,
    Path(user_id): Path<String>,
) -> Result<Json<PhotoResponse>, ApiError> {
    let account = user_manager
        .get_user_by_public_id(&user_id)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    match account.photo_url {
        Some(photo_url) => Ok(Json(PhotoResponse { photo_url })),
        None => Err(ApiError::not_found("No photo")),
    }
}

pub async fn update_name(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<UpdateNameBody>,
) -> Result<Json<UserResponse>, ApiError> {
    let name = required(body.name, "Name is required")?;
    let account = user_manager
        .update_name(session.user_id, &name)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse {
        msg: "Name updated successfully".to_owned(),
        user: account.summary(),
    }))
}

pub async fn update_photo(
    session: Session,
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<UserResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Malformed upload"))?
    {
        if field.name() == Some("photo") {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|_| ApiError::validation("Photo exceeds the upload size limit"))?;
            upload = Some((bytes, content_type));
        }
    }

    let (bytes, content_type) = upload.ok_or_else(|| ApiError::validation("No file uploaded"))?;
    if bytes.len() > MAX_PHOTO_UPLOAD_BYTES {
        return Err(ApiError::validation("Photo exceeds the upload size limit"));
    }

    let image_host = state
        .image_host
        .clone()
        .ok_or_else(|| ApiError::Storage(anyhow::anyhow!("No image host configured")))?;
    let photo_url = image_host
        .upload(bytes.to_vec(), &content_type)
        .await
        .map_err(|_| ApiError::Upstream("Upload failed".to_owned()))?;

    let account = state
        .user_manager
        .update_photo_url(session.user_id, &photo_url)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(UserResponse {
        msg: "Profile photo updated successfully".to_owned(),
        user: account.summary(),
    }))
}

pub async fn record_recent_play(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<SongIdBody>,
) -> Result<Json<RecentPlaysResponse>, ApiError> {
    let song_id = required(body.song_id, "songId required")?;
    let recent_plays = user_manager.record_recent_play(session.user_id, &song_id)?;
    Ok(Json(RecentPlaysResponse {
        msg: Some("Added to recent plays".to_owned()),
        recent_plays,
    }))
}

pub async fn get_recent_plays(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<RecentPlaysResponse>, ApiError> {
    Ok(Json(RecentPlaysResponse {
        msg: None,
        recent_plays: user_manager.get_recent_plays(session.user_id)?,
    }))
}

pub async fn toggle_like(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<SongIdBody>,
) -> Result<Json<LikedSongsResponse>, ApiError> {
    let song_id = required(body.song_id, "songId required")?;
    let (outcome, liked_songs) = user_manager.toggle_like(session.user_id, &song_id)?;
    let msg = match outcome {
        ToggleOutcome::Added => "Song liked",
        ToggleOutcome::Removed => "Song unliked",
    };
    Ok(Json(LikedSongsResponse {
        msg: Some(msg.to_owned()),
        liked_songs,
    }))
}

pub async fn get_liked_songs(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<LikedSongsResponse>, ApiError> {
    Ok(Json(LikedSongsResponse {
        msg: None,
        liked_songs: user_manager.get_liked_songs(session.user_id)?,
    }))
}

pub async fn toggle_library_entry(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(kind): Path<String>,
    Json(body): Json<LibraryToggleBody>,
) -> Result<Json<LibraryResponse>, ApiError> {
    let kind: LibraryKind = kind
        .parse()
        .map_err(|_| ApiError::validation("Invalid library type"))?;
    let entry_id = required(body.id, "ID required")?;

    let (outcome, library) = user_manager.toggle_library_entry(session.user_id, kind, &entry_id)?;
    let msg = match outcome {
        ToggleOutcome::Added => format!("Added to {}", kind),
        ToggleOutcome::Removed => format!("Removed from {}", kind),
    };
    Ok(Json(LibraryResponse {
        msg: Some(msg),
        library,
    }))
}

pub async fn get_library(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<LibraryResponse>, ApiError> {
    Ok(Json(LibraryResponse {
        msg: None,
        library: user_manager.get_library(session.user_id)?,
    }))
}

pub async fn create_self_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<Json<SelfPlaylistsResponse>, ApiError> {
    let name = required(body.name, "Playlist name required")?;
    let self_playlists =
        user_manager.create_self_playlist(session.user_id, &name, body.description.as_deref())?;
    Ok(Json(SelfPlaylistsResponse {
        msg: Some("Playlist created".to_owned()),
        self_playlists,
    }))
}

pub async fn get_self_playlists(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
) -> Result<Json<SelfPlaylistsResponse>, ApiError> {
    Ok(Json(SelfPlaylistsResponse {
        msg: None,
        self_playlists: user_manager.get_self_playlists(session.user_id)?,
    }))
}

pub async fn add_song_to_self_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(playlist_id): Path<String>,
    Json(body): Json<SongIdBody>,
) -> Result<Json<PlaylistResponse>, ApiError> {
    let song_id = required(body.song_id, "songId required")?;
    let playlist = user_manager
        .add_song_to_self_playlist(session.user_id, &playlist_id, &song_id)?
        .ok_or_else(|| ApiError::not_found("Playlist not found"))?;
    Ok(Json(PlaylistResponse {
        msg: "Song added".to_owned(),
        playlist,
    }))
}

pub async fn delete_self_playlist(
    session: Session,
    State(user_manager): State<GuardedUserManager>,
    Path(playlist_id): Path<String>,
) -> Result<Json<SelfPlaylistsResponse>, ApiError> {
    let self_playlists = user_manager.delete_self_playlist(session.user_id, &playlist_id)?;
    Ok(Json(SelfPlaylistsResponse {
        msg: Some("Playlist deleted".to_owned()),
        self_playlists,
    }))
}
