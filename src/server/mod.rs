mod auth_routes;
pub mod config;
mod http_layers;
pub mod server;
pub(crate) mod session;
pub mod state;
mod user_routes;

pub use config::ServerConfig;
pub use http_layers::*;
pub use server::{make_app, run_server};
pub use user_routes::MAX_PHOTO_UPLOAD_BYTES;
