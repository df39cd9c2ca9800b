use super::state::ServerState;

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use std::convert::Infallible;
use serde_json::json;
use tracing::debug;

/// An authenticated caller, resolved from the bearer token of the request.
#[derive(Debug)]
pub struct Session {
    /// Internal storage id of the user.
    pub user_id: usize,
    /// External-facing user id, as carried by the token.
    pub public_user_id: String,
    pub token: String,
}

pub enum SessionExtractionError {
    NoToken,
    InvalidToken,
    InternalError,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::NoToken => {
                (StatusCode::UNAUTHORIZED, Json(json!({"msg": "No token"}))).into_response()
            }
            SessionExtractionError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"msg": "Token is not valid"})),
            )
                .into_response(),
            SessionExtractionError::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_owned())
}

fn extract_session(parts: &Parts, ctx: &ServerState) -> Result<Session, SessionExtractionError> {
    let token = extract_bearer_token(parts).ok_or(SessionExtractionError::NoToken)?;

    let claims = ctx.token_signer.verify(&token).map_err(|err| {
        debug!("Session token rejected: {}", err);
        SessionExtractionError::InvalidToken
    })?;

    let account = ctx
        .user_manager
        .get_user_by_public_id(&claims.sub)
        .map_err(|err| {
            debug!("Failed to resolve session user: {:#}", err);
            SessionExtractionError::InternalError
        })?
        .ok_or(SessionExtractionError::InvalidToken)?;

    Ok(Session {
        user_id: account.id,
        public_user_id: account.public_id,
        token,
    })
}

impl FromRequestParts<ServerState> for Session {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        extract_session(parts, ctx)
    }
}

impl OptionalFromRequestParts<ServerState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(extract_session(parts, ctx).ok())
    }
}
