use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Typed auth failures. Every variant maps to a fixed client-facing payload;
/// the rendering happens exactly once, at the HTTP boundary below.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("not enough data")]
    NotEnoughData,
    #[error("already exists")]
    AlreadyExists,
    #[error("not found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no token provided")]
    MissingCredential,
    #[error("invalid token")]
    InvalidToken,
    #[error("session expired")]
    SessionExpired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::Internal(e.into())
    }
}

impl From<bcrypt::BcryptError> for AuthError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AuthError::Internal(e.into())
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::NotEnoughData
            | AuthError::AlreadyExists
            | AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            // Stale-session and decode failures are one client-facing
            // category: the caller only learns the token no longer works.
            AuthError::MissingCredential
            | AuthError::InvalidToken
            | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::NotEnoughData => "Not enough data",
            AuthError::AlreadyExists => "Already exists",
            AuthError::NotFound => "Not found",
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::MissingCredential => "No token provided",
            AuthError::InvalidToken | AuthError::SessionExpired => "Invalid token",
            AuthError::Internal(_) => "Server error",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(e) = &self {
            tracing::error!("internal error: {e:#}");
        }
        (self.status(), Json(json!({ "error": self.message() }))).into_response()
    }
}
