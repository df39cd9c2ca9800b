use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;

use super::auth::{generate_verification_token, PasswordHasher};
use super::user_models::{
    Library, LibraryKind, SelfPlaylist, ToggleOutcome, UserAccount, UserRecord, RECENT_PLAYS_CAP,
};
use super::user_store::{NewUser, UserStore};

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("User already exists")]
    EmailTaken,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("User not found")]
    UnknownEmail,
    #[error("Please verify your email first")]
    Unverified,
    #[error("Invalid credentials")]
    WrongPassword,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Domain rules over the user store: signup/verification/login checks and
/// the toggle/ring-buffer semantics of the profile lists.
pub struct UserManager {
    user_store: Arc<dyn UserStore>,
}

impl UserManager {
    pub fn new(user_store: Arc<dyn UserStore>) -> Self {
        Self { user_store }
    }

    /// Creates an unverified account with a hashed password and a fresh
    /// verification token.
    pub fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserAccount, SignupError> {
        if self.user_store.get_user_by_email(email)?.is_some() {
            return Err(SignupError::EmailTaken);
        }

        let hasher = PasswordHasher::default();
        let salt = hasher.generate_b64_salt();
        let password_hash = hasher.hash(password.as_bytes(), &salt)?;

        let account = self.user_store.create_user(NewUser {
            name: name.to_owned(),
            email: email.to_owned(),
            password_hash,
            hasher,
            verification_token: generate_verification_token(),
        })?;
        Ok(account)
    }

    /// Consumes a verification token: flags the account verified and clears
    /// the token so the link is single-use.
    /// Returns Ok(None) for unknown (or already consumed) tokens.
    pub fn verify_email(&self, token: &str) -> Result<Option<UserAccount>> {
        let account = match self.user_store.get_user_by_verification_token(token)? {
            None => return Ok(None),
            Some(account) => account,
        };
        self.user_store.mark_user_verified(account.id)?;
        let refreshed = self
            .user_store
            .get_user_by_id(account.id)?
            .context("Verified user disappeared")?;
        Ok(Some(refreshed))
    }

    pub fn login(&self, email: &str, password: &str) -> Result<UserAccount, LoginError> {
        let account = self
            .user_store
            .get_user_by_email(email)?
            .ok_or(LoginError::UnknownEmail)?;

        if !account.verified {
            return Err(LoginError::Unverified);
        }

        let matches = account
            .hasher
            .verify(password, account.password_hash.as_str())?;
        if !matches {
            return Err(LoginError::WrongPassword);
        }
        Ok(account)
    }

    pub fn get_user(&self, user_id: usize) -> Result<Option<UserAccount>> {
        self.user_store.get_user_by_id(user_id)
    }

    pub fn get_user_by_public_id(&self, public_id: &str) -> Result<Option<UserAccount>> {
        self.user_store.get_user_by_public_id(public_id)
    }

    /// Assembles the full self-readable record: profile plus all lists.
    pub fn get_self_record(&self, user_id: usize) -> Result<Option<UserRecord>> {
        let account = match self.user_store.get_user_by_id(user_id)? {
            None => return Ok(None),
            Some(account) => account,
        };
        Ok(Some(UserRecord {
            user_id: account.public_id,
            name: account.name,
            email: account.email,
            verified: account.verified,
            photo_url: account.photo_url,
            recent_plays: self.user_store.get_recent_plays(user_id)?,
            liked_songs: self.user_store.get_liked_songs(user_id)?,
            library: self.user_store.get_library(user_id)?,
            self_playlists: self.user_store.get_self_playlists(user_id)?,
        }))
    }

    pub fn update_name(&self, user_id: usize, name: &str) -> Result<Option<UserAccount>> {
        if self.user_store.get_user_by_id(user_id)?.is_none() {
            return Ok(None);
        }
        self.user_store.update_user_name(user_id, name)?;
        self.user_store.get_user_by_id(user_id)
    }

    pub fn update_photo_url(&self, user_id: usize, photo_url: &str) -> Result<Option<UserAccount>> {
        if self.user_store.get_user_by_id(user_id)?.is_none() {
            return Ok(None);
        }
        self.user_store.update_user_photo_url(user_id, photo_url)?;
        self.user_store.get_user_by_id(user_id)
    }

    /// Moves the song to the front of the recent plays; the list never grows
    /// past its capacity. Returns the updated list.
    pub fn record_recent_play(&self, user_id: usize, song_id: &str) -> Result<Vec<String>> {
        self.user_store
            .record_recent_play(user_id, song_id, RECENT_PLAYS_CAP)
    }

    pub fn get_recent_plays(&self, user_id: usize) -> Result<Vec<String>> {
        self.user_store.get_recent_plays(user_id)
    }

    /// Presence toggle: removes the song if liked, prepends it otherwise.
    /// Returns which way it went and the resulting list.
    pub fn toggle_like(
        &self,
        user_id: usize,
        song_id: &str,
    ) -> Result<(ToggleOutcome, Vec<String>)> {
        let outcome = if self.user_store.is_liked_song(user_id, song_id)? {
            self.user_store.remove_liked_song(user_id, song_id)?;
            ToggleOutcome::Removed
        } else {
            self.user_store.add_liked_song(user_id, song_id)?;
            ToggleOutcome::Added
        };
        Ok((outcome, self.user_store.get_liked_songs(user_id)?))
    }

    pub fn get_liked_songs(&self, user_id: usize) -> Result<Vec<String>> {
        self.user_store.get_liked_songs(user_id)
    }

    /// Presence toggle on the followed-entity list selected by `kind`.
    pub fn toggle_library_entry(
        &self,
        user_id: usize,
        kind: LibraryKind,
        entry_id: &str,
    ) -> Result<(ToggleOutcome, Library)> {
        let outcome = if self.user_store.is_library_entry(user_id, kind, entry_id)? {
            self.user_store
                .remove_library_entry(user_id, kind, entry_id)?;
            ToggleOutcome::Removed
        } else {
            self.user_store.add_library_entry(user_id, kind, entry_id)?;
            ToggleOutcome::Added
        };
        Ok((outcome, self.user_store.get_library(user_id)?))
    }

    pub fn get_library(&self, user_id: usize) -> Result<Library> {
        self.user_store.get_library(user_id)
    }

    /// Creates a playlist and returns the updated full list.
    pub fn create_self_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: Option<&str>,
    ) -> Result<Vec<SelfPlaylist>> {
        self.user_store
            .create_self_playlist(user_id, name, description)?;
        self.user_store.get_self_playlists(user_id)
    }

    pub fn get_self_playlists(&self, user_id: usize) -> Result<Vec<SelfPlaylist>> {
        self.user_store.get_self_playlists(user_id)
    }

    /// Appends the song unless already present. Ok(None) if the playlist
    /// does not belong to this user.
    pub fn add_song_to_self_playlist(
        &self,
        user_id: usize,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Option<SelfPlaylist>> {
        self.user_store
            .add_song_to_self_playlist(user_id, playlist_id, song_id)
    }

    /// Removes the playlist (idempotent) and returns the updated list.
    pub fn delete_self_playlist(
        &self,
        user_id: usize,
        playlist_id: &str,
    ) -> Result<Vec<SelfPlaylist>> {
        self.user_store.delete_self_playlist(user_id, playlist_id)?;
        self.user_store.get_self_playlists(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::SqliteUserStore;

    fn test_manager() -> (tempfile::TempDir, UserManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteUserStore::new(dir.path().join("user.db")).unwrap());
        (dir, UserManager::new(store))
    }

    #[test]
    fn signup_rejects_duplicate_email() {
        let (_dir, manager) = test_manager();
        manager.signup("A", "a@x.com", "pw").unwrap();
        assert!(matches!(
            manager.signup("B", "a@x.com", "pw2"),
            Err(SignupError::EmailTaken)
        ));
    }

    #[test]
    fn verification_link_is_single_use() {
        let (_dir, manager) = test_manager();
        let account = manager.signup("A", "a@x.com", "pw").unwrap();
        let token = account.verification_token.clone().unwrap();

        let verified = manager.verify_email(&token).unwrap().unwrap();
        assert!(verified.verified);
        assert!(verified.verification_token.is_none());

        // Re-using the consumed token reports an invalid link
        assert!(manager.verify_email(&token).unwrap().is_none());
    }

    #[test]
    fn login_distinguishes_failure_causes() {
        let (_dir, manager) = test_manager();
        let account = manager.signup("A", "a@x.com", "pw").unwrap();

        assert!(matches!(
            manager.login("nobody@x.com", "pw"),
            Err(LoginError::UnknownEmail)
        ));

        // Correct password on an unverified account is rejected as
        // unverified, not as invalid credentials
        assert!(matches!(
            manager.login("a@x.com", "pw"),
            Err(LoginError::Unverified)
        ));

        let token = account.verification_token.unwrap();
        manager.verify_email(&token).unwrap().unwrap();

        assert!(matches!(
            manager.login("a@x.com", "wrong"),
            Err(LoginError::WrongPassword)
        ));
        let logged_in = manager.login("a@x.com", "pw").unwrap();
        assert_eq!(logged_in.email, "a@x.com");
    }

    #[test]
    fn like_toggle_is_its_own_inverse() {
        let (_dir, manager) = test_manager();
        let user = manager.signup("A", "a@x.com", "pw").unwrap();

        let (outcome, liked) = manager.toggle_like(user.id, "s1").unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
        assert_eq!(liked, vec!["s1"]);

        let (outcome, liked) = manager.toggle_like(user.id, "s1").unwrap();
        assert_eq!(outcome, ToggleOutcome::Removed);
        assert!(liked.is_empty());
    }

    #[test]
    fn library_toggle_scopes_by_kind() {
        let (_dir, manager) = test_manager();
        let user = manager.signup("A", "a@x.com", "pw").unwrap();

        let (outcome, library) = manager
            .toggle_library_entry(user.id, LibraryKind::Artists, "art1")
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
        assert_eq!(library.artists, vec!["art1"]);
        assert!(library.albums.is_empty());

        // Same id under a different kind is an independent entry
        let (outcome, library) = manager
            .toggle_library_entry(user.id, LibraryKind::Albums, "art1")
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Added);
        assert_eq!(library.artists, vec!["art1"]);
        assert_eq!(library.albums, vec!["art1"]);

        let (outcome, library) = manager
            .toggle_library_entry(user.id, LibraryKind::Artists, "art1")
            .unwrap();
        assert_eq!(outcome, ToggleOutcome::Removed);
        assert!(library.artists.is_empty());
        assert_eq!(library.albums, vec!["art1"]);
    }

    #[test]
    fn self_record_gathers_all_lists() {
        let (_dir, manager) = test_manager();
        let user = manager.signup("A", "a@x.com", "pw").unwrap();

        manager.record_recent_play(user.id, "s1").unwrap();
        manager.toggle_like(user.id, "s2").unwrap();
        manager
            .toggle_library_entry(user.id, LibraryKind::Playlists, "pl9")
            .unwrap();
        manager.create_self_playlist(user.id, "mine", None).unwrap();

        let record = manager.get_self_record(user.id).unwrap().unwrap();
        assert_eq!(record.user_id, user.public_id);
        assert_eq!(record.recent_plays, vec!["s1"]);
        assert_eq!(record.liked_songs, vec!["s2"]);
        assert_eq!(record.library.playlists, vec!["pl9"]);
        assert_eq!(record.self_playlists.len(), 1);
        assert_eq!(record.self_playlists[0].name, "mine");
    }
}
