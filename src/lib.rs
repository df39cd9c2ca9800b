//! Mellow Server Library
//!
//! This library exposes the internal modules for testing and potential reuse:
//! the playback/queue engine, the catalog client and the user/auth backend.

pub mod catalog;
pub mod error;
pub mod image_host;
pub mod mailer;
pub mod playback;
pub mod server;
pub mod sqlite_persistence;
pub mod user;

// Re-export commonly used types for convenience
pub use catalog::{CatalogClient, CatalogError, TrackResolver};
pub use playback::{AudioOutput, PlaybackEngine, Transport};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
pub use user::{SqliteUserStore, UserManager, UserStore};
