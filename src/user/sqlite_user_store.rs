use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};
use tracing::info;

use super::auth::random_string;
use super::user_models::{
    Library, LibraryKind, SelfPlaylist, UserAccount, PUBLIC_USER_ID_LEN, SELF_PLAYLIST_ID_LEN,
};
use super::user_store::{NewUser, UserStore};

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("public_id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("password_hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "verified",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("verification_token", &SqlType::Text),
        sqlite_column!("photo_url", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[
        ("idx_user_public_id", "public_id"),
        ("idx_user_email", "email"),
    ],
};

const RECENT_PLAY_TABLE_V_0: Table = Table {
    name: "recent_play",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
            })
        ),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "song_id"]],
    indices: &[("idx_recent_play_user_id", "user_id")],
};

const LIKED_SONG_TABLE_V_0: Table = Table {
    name: "liked_song",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
            })
        ),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "song_id"]],
    indices: &[("idx_liked_song_user_id", "user_id")],
};

const LIBRARY_ENTRY_TABLE_V_0: Table = Table {
    name: "library_entry",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
            })
        ),
        sqlite_column!("kind", &SqlType::Integer, non_null = true),
        sqlite_column!("entry_id", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "kind", "entry_id"]],
    indices: &[("idx_library_entry_user_id", "user_id")],
};

const SELF_PLAYLIST_TABLE_V_0: Table = Table {
    name: "self_playlist",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Text,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_self_playlist_user_id", "user_id")],
};

const SELF_PLAYLIST_SONG_TABLE_V_0: Table = Table {
    name: "self_playlist_song",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            non_null = true,
            is_unique = true
        ),
        sqlite_column!(
            "playlist_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "self_playlist",
                foreign_column: "id",
            })
        ),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
    ],
    unique_constraints: &[&["playlist_id", "song_id"]],
    indices: &[("idx_self_playlist_song_playlist_id", "playlist_id")],
};

const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        RECENT_PLAY_TABLE_V_0,
        LIKED_SONG_TABLE_V_0,
        LIBRARY_ENTRY_TABLE_V_0,
        SELF_PLAYLIST_TABLE_V_0,
        SELF_PLAYLIST_SONG_TABLE_V_0,
    ],
    migration: None,
}];

const USER_COLUMNS: &str =
    "id, public_id, name, email, password_hash, hasher, verified, verification_token, photo_url, created";

/// A raw `user` row before the hasher name is parsed.
struct UserRow {
    id: i64,
    public_id: String,
    name: String,
    email: String,
    password_hash: String,
    hasher: String,
    verified: bool,
    verification_token: Option<String>,
    photo_url: Option<String>,
    created: i64,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(UserRow {
            id: row.get(0)?,
            public_id: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            password_hash: row.get(4)?,
            hasher: row.get(5)?,
            verified: row.get(6)?,
            verification_token: row.get(7)?,
            photo_url: row.get(8)?,
            created: row.get(9)?,
        })
    }

    fn into_account(self) -> Result<UserAccount> {
        Ok(UserAccount {
            id: self.id as usize,
            public_id: self.public_id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            hasher: super::auth::PasswordHasher::from_str(&self.hasher)?,
            verified: self.verified,
            verification_token: self.verification_token,
            photo_url: self.photo_url,
            created: UNIX_EPOCH + Duration::from_secs(self.created.max(0) as u64),
        })
    }
}

#[derive(Clone)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            let conn = Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            conn.execute("PRAGMA foreign_keys = ON;", [])?;
            conn
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<_, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if version >= VERSIONED_SCHEMAS.len() {
            bail!("Database version {} is too new", db_version);
        }
        VERSIONED_SCHEMAS
            .get(version)
            .context("Failed to get schema")?
            .validate(&conn)?;

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;
        Ok(())
    }

    fn get_user_where<P: rusqlite::ToSql>(
        &self,
        where_clause: &str,
        param: P,
    ) -> Result<Option<UserAccount>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE {}",
                    USER_COLUMNS, USER_TABLE_V_0.name, where_clause
                ),
                params![param],
                UserRow::from_row,
            )
            .optional()?;

        row.map(UserRow::into_account).transpose()
    }

    fn load_songs_of_playlist(conn: &Connection, playlist_id: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id FROM {} WHERE playlist_id = ?1 ORDER BY position ASC",
            SELF_PLAYLIST_SONG_TABLE_V_0.name
        ))?;
        let songs = stmt
            .query_map(params![playlist_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(songs)
    }

    fn load_playlist(
        conn: &Connection,
        user_id: usize,
        playlist_id: &str,
    ) -> Result<Option<SelfPlaylist>> {
        let header = conn
            .query_row(
                &format!(
                    "SELECT id, name, description, created FROM {} WHERE user_id = ?1 AND id = ?2",
                    SELF_PLAYLIST_TABLE_V_0.name
                ),
                params![user_id, playlist_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        match header {
            None => Ok(None),
            Some((id, name, description, created)) => {
                let songs = Self::load_songs_of_playlist(conn, &id)?;
                Ok(Some(SelfPlaylist {
                    playlist_id: id,
                    name,
                    description,
                    songs,
                    created_at: created.max(0) as u64,
                }))
            }
        }
    }

    fn library_list(conn: &Connection, user_id: usize, kind: LibraryKind) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT entry_id FROM {} WHERE user_id = ?1 AND kind = ?2 ORDER BY id DESC",
            LIBRARY_ENTRY_TABLE_V_0.name
        ))?;
        let entries = stmt
            .query_map(params![user_id, kind.to_int()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(entries)
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, new_user: NewUser) -> Result<UserAccount> {
        let public_id = {
            let conn = self.conn.lock().unwrap();

            // Generate an external id that's not already taken
            let mut public_id = random_string(PUBLIC_USER_ID_LEN);
            while conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE public_id = ?1",
                    USER_TABLE_V_0.name
                ),
                params![public_id],
                |row| row.get::<_, i64>(0),
            )? > 0
            {
                public_id = random_string(PUBLIC_USER_ID_LEN);
            }

            conn.execute(
                &format!(
                    "INSERT INTO {} (public_id, name, email, password_hash, hasher, verification_token) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    USER_TABLE_V_0.name
                ),
                params![
                    public_id,
                    new_user.name,
                    new_user.email,
                    new_user.password_hash,
                    new_user.hasher.to_string(),
                    new_user.verification_token,
                ],
            )
            .with_context(|| format!("Failed to create user {}", new_user.email))?;
            public_id
        };

        self.get_user_by_public_id(&public_id)?
            .context("Created user not found")
    }

    fn get_user_by_id(&self, user_id: usize) -> Result<Option<UserAccount>> {
        self.get_user_where("id = ?1", user_id)
    }

    fn get_user_by_public_id(&self, public_id: &str) -> Result<Option<UserAccount>> {
        self.get_user_where("public_id = ?1", public_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        self.get_user_where("email = ?1", email)
    }

    fn get_user_by_verification_token(&self, token: &str) -> Result<Option<UserAccount>> {
        self.get_user_where("verification_token = ?1", token)
    }

    fn mark_user_verified(&self, user_id: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET verified = 1, verification_token = NULL WHERE id = ?1",
                USER_TABLE_V_0.name
            ),
            params![user_id],
        )?;
        Ok(())
    }

    fn update_user_name(&self, user_id: usize, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("UPDATE {} SET name = ?1 WHERE id = ?2", USER_TABLE_V_0.name),
            params![name, user_id],
        )?;
        Ok(())
    }

    fn update_user_photo_url(&self, user_id: usize, photo_url: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET photo_url = ?1 WHERE id = ?2",
                USER_TABLE_V_0.name
            ),
            params![photo_url, user_id],
        )?;
        Ok(())
    }

    fn record_recent_play(&self, user_id: usize, song_id: &str, cap: usize) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Remove if present, re-insert at the front, trim to capacity.
        tx.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND song_id = ?2",
                RECENT_PLAY_TABLE_V_0.name
            ),
            params![user_id, song_id],
        )?;
        tx.execute(
            &format!(
                "INSERT INTO {} (user_id, song_id) VALUES (?1, ?2)",
                RECENT_PLAY_TABLE_V_0.name
            ),
            params![user_id, song_id],
        )?;
        tx.execute(
            &format!(
                "DELETE FROM {table} WHERE user_id = ?1 AND id NOT IN \
                 (SELECT id FROM {table} WHERE user_id = ?1 ORDER BY id DESC LIMIT ?2)",
                table = RECENT_PLAY_TABLE_V_0.name
            ),
            params![user_id, cap],
        )?;

        let plays = {
            let mut stmt = tx.prepare(&format!(
                "SELECT song_id FROM {} WHERE user_id = ?1 ORDER BY id DESC",
                RECENT_PLAY_TABLE_V_0.name
            ))?;
            let plays = stmt
                .query_map(params![user_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            plays
        };

        tx.commit()?;
        Ok(plays)
    }

    fn get_recent_plays(&self, user_id: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id FROM {} WHERE user_id = ?1 ORDER BY id DESC",
            RECENT_PLAY_TABLE_V_0.name
        ))?;
        let plays = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(plays)
    }

    fn is_liked_song(&self, user_id: usize, song_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND song_id = ?2",
                LIKED_SONG_TABLE_V_0.name
            ),
            params![user_id, song_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn add_liked_song(&self, user_id: usize, song_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, song_id) VALUES (?1, ?2)",
                LIKED_SONG_TABLE_V_0.name
            ),
            params![user_id, song_id],
        )?;
        Ok(())
    }

    fn remove_liked_song(&self, user_id: usize, song_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND song_id = ?2",
                LIKED_SONG_TABLE_V_0.name
            ),
            params![user_id, song_id],
        )?;
        Ok(())
    }

    fn get_liked_songs(&self, user_id: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT song_id FROM {} WHERE user_id = ?1 ORDER BY id DESC",
            LIKED_SONG_TABLE_V_0.name
        ))?;
        let songs = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(songs)
    }

    fn is_library_entry(&self, user_id: usize, kind: LibraryKind, entry_id: &str) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND kind = ?2 AND entry_id = ?3",
                LIBRARY_ENTRY_TABLE_V_0.name
            ),
            params![user_id, kind.to_int(), entry_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn add_library_entry(&self, user_id: usize, kind: LibraryKind, entry_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, kind, entry_id) VALUES (?1, ?2, ?3)",
                LIBRARY_ENTRY_TABLE_V_0.name
            ),
            params![user_id, kind.to_int(), entry_id],
        )?;
        Ok(())
    }

    fn remove_library_entry(
        &self,
        user_id: usize,
        kind: LibraryKind,
        entry_id: &str,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND kind = ?2 AND entry_id = ?3",
                LIBRARY_ENTRY_TABLE_V_0.name
            ),
            params![user_id, kind.to_int(), entry_id],
        )?;
        Ok(())
    }

    fn get_library(&self, user_id: usize) -> Result<Library> {
        let conn = self.conn.lock().unwrap();
        Ok(Library {
            artists: Self::library_list(&conn, user_id, LibraryKind::Artists)?,
            albums: Self::library_list(&conn, user_id, LibraryKind::Albums)?,
            playlists: Self::library_list(&conn, user_id, LibraryKind::Playlists)?,
        })
    }

    fn create_self_playlist(
        &self,
        user_id: usize,
        name: &str,
        description: Option<&str>,
    ) -> Result<SelfPlaylist> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        // Generate a random A-z0-9 id that's not already a playlist id
        let mut playlist_id = random_string(SELF_PLAYLIST_ID_LEN);
        while tx.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE id = ?1",
                SELF_PLAYLIST_TABLE_V_0.name
            ),
            params![playlist_id],
            |row| row.get::<_, i64>(0),
        )? > 0
        {
            playlist_id = random_string(SELF_PLAYLIST_ID_LEN);
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (id, user_id, name, description) VALUES (?1, ?2, ?3, ?4)",
                SELF_PLAYLIST_TABLE_V_0.name
            ),
            params![playlist_id, user_id, name, description],
        )
        .context("Could not create playlist")?;

        let playlist =
            Self::load_playlist(&tx, user_id, &playlist_id)?.context("Created playlist not found")?;
        tx.commit()?;
        Ok(playlist)
    }

    fn get_self_playlists(&self, user_id: usize) -> Result<Vec<SelfPlaylist>> {
        let conn = self.conn.lock().unwrap();
        let ids = {
            let mut stmt = conn.prepare(&format!(
                "SELECT id FROM {} WHERE user_id = ?1 ORDER BY rowid ASC",
                SELF_PLAYLIST_TABLE_V_0.name
            ))?;
            let ids = stmt
                .query_map(params![user_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            ids
        };

        let mut playlists = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(playlist) = Self::load_playlist(&conn, user_id, &id)? {
                playlists.push(playlist);
            }
        }
        Ok(playlists)
    }

    fn get_self_playlist(
        &self,
        user_id: usize,
        playlist_id: &str,
    ) -> Result<Option<SelfPlaylist>> {
        let conn = self.conn.lock().unwrap();
        Self::load_playlist(&conn, user_id, playlist_id)
    }

    fn add_song_to_self_playlist(
        &self,
        user_id: usize,
        playlist_id: &str,
        song_id: &str,
    ) -> Result<Option<SelfPlaylist>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let owned: Option<String> = tx
            .query_row(
                &format!(
                    "SELECT id FROM {} WHERE user_id = ?1 AND id = ?2",
                    SELF_PLAYLIST_TABLE_V_0.name
                ),
                params![user_id, playlist_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Ok(None);
        }

        // Append at the next position; re-adding a present song is a no-op.
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {table} (playlist_id, song_id, position) VALUES \
                 (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM {table} WHERE playlist_id = ?1))",
                table = SELF_PLAYLIST_SONG_TABLE_V_0.name
            ),
            params![playlist_id, song_id],
        )?;

        let playlist = Self::load_playlist(&tx, user_id, playlist_id)?;
        tx.commit()?;
        Ok(playlist)
    }

    fn delete_self_playlist(&self, user_id: usize, playlist_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND id = ?2",
                SELF_PLAYLIST_TABLE_V_0.name
            ),
            params![user_id, playlist_id],
        )?;
        Ok(())
    }
}
