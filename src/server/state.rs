use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::image_host::ImageHost;
use crate::mailer::Mailer;
use crate::user::{SessionTokenSigner, UserManager};

use super::ServerConfig;

pub type GuardedUserManager = Arc<UserManager>;
pub type GuardedMailer = Arc<dyn Mailer>;
pub type OptionalImageHost = Option<Arc<dyn ImageHost>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_manager: GuardedUserManager,
    pub token_signer: SessionTokenSigner,
    pub mailer: GuardedMailer,
    pub image_host: OptionalImageHost,
}

impl FromRef<ServerState> for GuardedUserManager {
    fn from_ref(input: &ServerState) -> Self {
        input.user_manager.clone()
    }
}

impl FromRef<ServerState> for SessionTokenSigner {
    fn from_ref(input: &ServerState) -> Self {
        input.token_signer.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

impl FromRef<ServerState> for GuardedMailer {
    fn from_ref(input: &ServerState) -> Self {
        input.mailer.clone()
    }
}

impl FromRef<ServerState> for OptionalImageHost {
    fn from_ref(input: &ServerState) -> Self {
        input.image_host.clone()
    }
}
