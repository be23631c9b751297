use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    errors::AuthError,
    models::{
        auth::{TokenKind, TokenPair},
        user::{User, UserRole},
    },
    services::{
        session::{is_session_valid, SessionStore},
        token::TokenCodec,
    },
};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, is_active, created_at, updated_at";

pub struct AuthService;

impl AuthService {
    /// Write a fresh session marker and mint the pair against it. Every
    /// successful signup/signin/refresh funnels through here, which is what
    /// keeps at most one refresh token live per user.
    pub async fn issue(
        pool: &PgPool,
        codec: &TokenCodec,
        user_id: Uuid,
    ) -> Result<TokenPair, AuthError> {
        let marker = SessionStore::replace_marker(pool, user_id).await?;
        let pair = codec
            .issue_pair(user_id, marker)
            .map_err(|e| AuthError::Internal(e.into()))?;
        Ok(pair)
    }

    pub async fn signup(
        pool: &PgPool,
        codec: &TokenCodec,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;
        if exists {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = bcrypt::hash(password, 12)?;
        let user: User = sqlx::query_as(&format!(
            "INSERT INTO users (email, password_hash, name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(UserRole::Brand.to_string())
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = %user.id, "new signup");
        let pair = Self::issue(pool, codec, user.id).await?;
        Ok((user, pair))
    }

    pub async fn signin(
        pool: &PgPool,
        codec: &TokenCodec,
        email: &str,
        password: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let user: User = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or(AuthError::NotFound)?;

        let valid = bcrypt::verify(password, &user.password_hash)?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let pair = Self::issue(pool, codec, user.id).await?;
        Ok((user, pair))
    }

    /// Rotate-and-invalidate: the presented refresh token is checked against
    /// the live marker, then the marker is replaced, killing the old pair
    /// (access token included) mid-TTL. Single-use; a retried refresh with
    /// the same token loses.
    pub async fn rotate(
        pool: &PgPool,
        codec: &TokenCodec,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = codec
            .decode(refresh_token, TokenKind::Refresh)
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        if !is_session_valid(pool, user_id, &claims.created).await? {
            return Err(AuthError::SessionExpired);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        if !exists {
            return Err(AuthError::InvalidToken);
        }

        Self::issue(pool, codec, user_id).await
    }

    /// Logout: same gate as rotate, then the marker is deleted outright.
    pub async fn revoke(
        pool: &PgPool,
        codec: &TokenCodec,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let claims = codec
            .decode(refresh_token, TokenKind::Refresh)
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        if !is_session_valid(pool, user_id, &claims.created).await? {
            return Err(AuthError::SessionExpired);
        }

        let deleted = SessionStore::delete_marker(pool, user_id).await?;
        if !deleted {
            // Marker vanished between the validity check and the delete —
            // another request already ended this session.
            return Err(AuthError::SessionExpired);
        }
        tracing::info!(%user_id, "session revoked");
        Ok(())
    }

    /// Verify the current password, store the new hash, and end the active
    /// session so every outstanding token dies.
    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let password_hash: String =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?
                .ok_or(AuthError::NotFound)?;

        let valid = bcrypt::verify(current_password, &password_hash)?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let new_hash = bcrypt::hash(new_password, 12)?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&new_hash)
            .bind(user_id)
            .execute(pool)
            .await?;

        SessionStore::delete_marker(pool, user_id).await?;
        Ok(())
    }

    pub async fn find_user(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AuthError> {
        let user = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }
}
