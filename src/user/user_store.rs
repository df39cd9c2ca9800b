use anyhow::Result;

use super::auth::PasswordHasher;
use super::user_models::{Library, LibraryKind, SelfPlaylist, UserAccount};

/// Fields needed to create a user row. The store generates the external
/// public id.
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub hasher: PasswordHasher,
    pub verification_token: String,
}

pub trait UserStore: Send + Sync {
    /// Creates a new unverified user and returns the stored account.
    /// Returns Err if the email is already registered.
    fn create_user(&self, new_user: NewUser) -> Result<UserAccount>;

    /// Returns the account with the given storage id.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_by_id(&self, user_id: usize) -> Result<Option<UserAccount>>;

    /// Returns the account with the given external public id.
    /// Returns Ok(None) if the user does not exist.
    fn get_user_by_public_id(&self, public_id: &str) -> Result<Option<UserAccount>>;

    /// Returns the account registered under the given email.
    /// Returns Ok(None) if the email is unknown.
    fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>>;

    /// Returns the account holding the given verification token.
    /// Returns Ok(None) if no unverified account carries the token.
    fn get_user_by_verification_token(&self, token: &str) -> Result<Option<UserAccount>>;

    /// Flags the user as verified and clears the verification token.
    fn mark_user_verified(&self, user_id: usize) -> Result<()>;

    fn update_user_name(&self, user_id: usize, name: &str) -> Result<()>;

    fn update_user_photo_url(&self, user_id: usize, photo_url: &str) -> Result<()>;

    /// Moves the song to the front of the recent plays, de-duplicating and
    /// trimming to `cap` entries in the same transaction.
    /// Returns the updated list, most recent first.
    fn record_recent_play(&self, user_id: usize, song_id: &str, cap: usize) -> Result<Vec<String>>;

    /// Returns recent plays, most recent first.
    fn get_recent_plays(&self, user_id: usize) -> Result<Vec<String>>;

    fn is_liked_song(&self, user_id: usize, song_id: &str) -> Result<bool>;

    /// Prepends the song to the liked list. The caller checks presence first.
    fn add_liked_song(&self, user_id: usize, song_id: &str) -> Result<()>;

    fn remove_liked_song(&self, user_id: usize, song_id: &str) -> Result<()>;

    /// Returns liked songs, most recently liked first.
    fn get_liked_songs(&self, user_id: usize) -> Result<Vec<String>>;

    fn is_library_entry(&self, user_id: usize, kind: LibraryKind, entry_id: &str) -> Result<bool>;

    fn add_library_entry(&self, user_id: usize, kind: LibraryKind, entry_id: &str) -> Result<()>;

    fn remove_library_entry(&self, user_id: usize, kind: LibraryKind, entry_id: &str)
        -> Result<()>;

    /// Returns all three followed-entity lists, each most recent first.
    fn get_library(&self, user_id: usize) -> Result<Library>;

    /// Creates an empty playlist with a generated opaque id.
    fn create_self_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: Option<&str>,
    ) -> Result<SelfPlaylist>;

    /// Returns the user's playlists in creation order.
    fn get_self_playlists(&self, user_id: usize) -> Result<Vec<SelfPlaylist>>;

    /// Returns one playlist owned by the user.
    /// Returns Ok(None) if the user has no playlist with that id.
    fn get_self_playlist(&self, user_id: usize, playlist_id: &str)
        -> Result<Option<SelfPlaylist>>;

    /// Appends the song to the playlist unless already present.
    /// Returns Ok(None) if the user has no playlist with that id.
    fn add_song_to_self_playlist(
        &self,
        user_id: usize,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Option<SelfPlaylist>>;

    /// Removes the playlist. Removing an absent playlist is not an error.
    fn delete_self_playlist(&self, user_id: usize, playlist_id: &str) -> Result<()>;
}
