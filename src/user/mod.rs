pub mod auth;
mod sqlite_user_store;
mod user_manager;
mod user_models;
mod user_store;

pub use auth::{PasswordHasher, SessionClaims, SessionTokenSigner, SESSION_TOKEN_VALIDITY_DAYS};
pub use sqlite_user_store::SqliteUserStore;
pub use user_manager::{LoginError, SignupError, UserManager};
pub use user_models::*;
pub use user_store::{NewUser, UserStore};
