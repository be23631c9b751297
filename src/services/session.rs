use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::auth::canonical_timestamp;

/// Server-side session markers: one row per user, holding the timestamp of
/// the most recent issuance. Tokens embed a copy of this timestamp; any
/// mismatch means the token belongs to a superseded session.
pub struct SessionStore;

impl SessionStore {
    pub async fn get_marker(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<DateTime<Utc>>> {
        let marker = sqlx::query_scalar(
            "SELECT created_at FROM token_sessions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(marker)
    }

    /// Atomically supersede any existing marker for this user. A single
    /// upsert keyed on the PRIMARY KEY, so concurrent calls for the same
    /// user serialize at the row level and exactly one timestamp survives.
    pub async fn replace_marker(pool: &PgPool, user_id: Uuid) -> anyhow::Result<DateTime<Utc>> {
        let marker = sqlx::query_scalar(
            "INSERT INTO token_sessions (user_id, created_at)
             VALUES ($1, NOW())
             ON CONFLICT (user_id) DO UPDATE SET created_at = EXCLUDED.created_at
             RETURNING created_at",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(marker)
    }

    pub async fn delete_marker(pool: &PgPool, user_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM token_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// The sole authorization gate for refresh, logout, and protected requests:
/// a token is honored only while its embedded `created` claim equals the
/// live marker exactly.
pub async fn is_session_valid(
    pool: &PgPool,
    user_id: Uuid,
    created: &str,
) -> anyhow::Result<bool> {
    let marker = SessionStore::get_marker(pool, user_id).await?;
    Ok(matches!(marker, Some(ts) if canonical_timestamp(ts) == created))
}
