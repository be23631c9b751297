use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
    errors::AuthError,
    models::auth::{AuthenticatedUser, TokenKind},
    services::{auth::AuthService, session::is_session_valid},
    AppState,
};

/// Pull the access token from the `Authorization: Bearer` header, falling
/// back to the `token` cookie set at issuance.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| get_cookie(headers, "token"))
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|part| {
            let part = part.trim();
            part.strip_prefix(&prefix).map(str::to_string)
        })
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            extract_access_token(&parts.headers).ok_or(AuthError::MissingCredential)?;

        let claims = state
            .codec
            .decode(&token, TokenKind::Access)
            .map_err(|_| AuthError::InvalidToken)?;
        let user_id: Uuid = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;

        // Cross-check against the live marker: logout or rotation kills
        // outstanding access tokens immediately, not just the refresh token.
        if !is_session_valid(&state.db, user_id, &claims.created).await? {
            return Err(AuthError::SessionExpired);
        }

        let user = AuthService::find_user(&state.db, user_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        Ok(AuthenticatedUser { user, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("token=from-cookie"),
        );
        assert_eq!(extract_access_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("a=1; token=abc.def.ghi; b=2"),
        );
        assert_eq!(
            extract_access_token(&headers).as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn missing_everything_yields_none() {
        assert_eq!(extract_access_token(&HeaderMap::new()), None);
    }
}
