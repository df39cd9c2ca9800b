//! Signup, email verification and login.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::ApiError;
use crate::user::{LoginError, SignupError, UserAccount, UserSummary};

use super::state::ServerState;

#[derive(Deserialize, Debug)]
pub struct SignupBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct LoginBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Serialize)]
pub struct AuthSuccessResponse {
    pub token: String,
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

#[derive(Serialize)]
pub struct MsgResponse {
    pub msg: String,
}

fn required(value: Option<String>, msg: &str) -> Result<String, ApiError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::validation(msg))
}

async fn send_verification_email(state: &ServerState, account: &UserAccount) {
    let token = match &account.verification_token {
        Some(token) => token,
        None => return,
    };
    let verify_url = format!(
        "{}/api/auth/verify/{}",
        state.config.public_base_url, token
    );
    let html_body = format!(
        "<p>Click <a href=\"{}\">here</a> to verify your email.</p>",
        verify_url
    );
    // Delivery failure does not roll back the signup; the link can be
    // re-sent out of band.
    if let Err(err) = state
        .mailer
        .send(&account.email, "Verify your account", &html_body)
        .await
    {
        error!(
            "Failed to send verification email to {}: {:#}",
            account.email, err
        );
    }
}

pub async fn signup(
    State(state): State<ServerState>,
    Json(body): Json<SignupBody>,
) -> Result<Json<AuthSuccessResponse>, ApiError> {
    let name = required(body.name, "Name is required")?;
    let email = required(body.email, "Email is required")?;
    let password = required(body.password, "Password is required")?;

    let account = state
        .user_manager
        .signup(&name, &email, &password)
        .map_err(|err| match err {
            SignupError::EmailTaken => ApiError::validation("User already exists"),
            SignupError::Storage(err) => ApiError::Storage(err),
        })?;

    let token = state
        .token_signer
        .issue(&account.public_id)
        .map_err(ApiError::Storage)?;

    send_verification_email(&state, &account).await;

    Ok(Json(AuthSuccessResponse {
        token,
        user: account.summary(),
        msg: Some("Verification email sent".to_owned()),
    }))
}

pub async fn verify_email(
    State(state): State<ServerState>,
    Path(token): Path<String>,
) -> Result<Json<MsgResponse>, ApiError> {
    match state.user_manager.verify_email(&token)? {
        Some(account) => {
            debug!("User {} verified their email", account.public_id);
            Ok(Json(MsgResponse {
                msg: "Email verified successfully".to_owned(),
            }))
        }
        None => Err(ApiError::validation("Invalid link")),
    }
}

pub async fn login(
    State(state): State<ServerState>,
    Json(body): Json<LoginBody>,
) -> Result<Json<AuthSuccessResponse>, ApiError> {
    let email = required(body.email, "Email is required")?;
    let password = required(body.password, "Password is required")?;

    let account = state
        .user_manager
        .login(&email, &password)
        .map_err(|err| match err {
            LoginError::UnknownEmail => ApiError::validation("User not found"),
            LoginError::Unverified => ApiError::validation("Please verify your email first"),
            LoginError::WrongPassword => ApiError::validation("Invalid credentials"),
            LoginError::Storage(err) => ApiError::Storage(err),
        })?;

    let token = state
        .token_signer
        .issue(&account.public_id)
        .map_err(ApiError::Storage)?;

    Ok(Json(AuthSuccessResponse {
        token,
        user: account.summary(),
        msg: None,
    }))
}
