use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

/// Token-kind discriminator embedded in every JWT.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims shared by access and refresh tokens.
///
/// `created` carries the session marker the token was issued against, in
/// canonical form (see [`canonical_timestamp`]). A token is only honored
/// while this value still equals the marker stored for the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub created: String,
    pub token_type: TokenKind,
    pub iat: usize,
    pub exp: usize,
}

/// Access + refresh token issued against a single session marker.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Extracted from a validated access token — available via Axum extractors.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub claims: Claims,
}

/// Canonical string form of a session marker: RFC 3339 UTC with microsecond
/// precision, matching Postgres TIMESTAMPTZ resolution so a marker that
/// round-trips through the database compares equal to the claim.
pub fn canonical_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_timestamp_keeps_microseconds() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 6, 12, 34, 56).unwrap()
            + chrono::Duration::microseconds(123456);
        assert_eq!(canonical_timestamp(ts), "2026-08-06T12:34:56.123456Z");
    }

    #[test]
    fn canonical_timestamp_pads_zero_fraction() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap();
        assert_eq!(canonical_timestamp(ts), "2026-08-06T00:00:00.000000Z");
    }

    #[test]
    fn canonical_timestamp_round_trips_exactly() {
        let ts = Utc::now();
        let parsed: DateTime<Utc> = canonical_timestamp(ts).parse().unwrap();
        assert_eq!(canonical_timestamp(parsed), canonical_timestamp(ts));
    }

    #[test]
    fn token_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&TokenKind::Refresh).unwrap(),
            "\"refresh\""
        );
    }
}
