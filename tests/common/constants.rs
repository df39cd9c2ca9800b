//! Shared constants for end-to-end tests
//!
//! When test data changes (user credentials, song ids, etc.),
//! update only this file.

// ============================================================================
// Test User Credentials
// ============================================================================

/// Default test user display name
pub const TEST_NAME: &str = "Test User";

/// Default test user email
pub const TEST_EMAIL: &str = "testuser@example.com";

/// Default test user password
pub const TEST_PASS: &str = "testpass123";

/// Secondary test user email (isolation tests)
pub const OTHER_EMAIL: &str = "otheruser@example.com";

// ============================================================================
// Test Song / Entity Ids
// ============================================================================

/// Song id used across liked/recent/playlist tests
pub const SONG_1_ID: &str = "song-1";

pub const SONG_2_ID: &str = "song-2";

pub const SONG_3_ID: &str = "song-3";

/// Artist id for library tests
pub const ARTIST_1_ID: &str = "artist-1";

/// Album id for library tests
pub const ALBUM_1_ID: &str = "album-1";

/// Playlist id (external catalog playlist) for library tests
pub const PLAYLIST_1_ID: &str = "playlist-1";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Secret used to sign session tokens in tests
pub const TEST_JWT_SECRET: &[u8] = b"e2e-test-secret";
