use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use crate::{
    errors::AuthError,
    middleware::auth::bearer_token,
    models::{
        auth::{AuthenticatedUser, TokenPair},
        user::{ChangePasswordRequest, SigninRequest, SignupRequest, User, UserData},
    },
    services::auth::AuthService,
    AppState,
};

/// Cookie lifetime in seconds (30 days). Deliberately longer than the access
/// token it carries: the cookie is the transport, the `exp` claim and the
/// session marker decide validity.
const TOKEN_COOKIE_MAX_AGE: u64 = 2_592_000;

/// Issuance contract: refresh token in the body under `token`, access token
/// in a cookie also named `token`. The naming overlap is inherited API
/// surface — clients depend on it.
fn auth_response(user: Option<&User>, pair: &TokenPair) -> Result<Response, AuthError> {
    let mut body = json!({ "token": pair.refresh });
    if let Some(user) = user {
        body["userData"] = serde_json::to_value(UserData::from(user))
            .map_err(|e| AuthError::Internal(e.into()))?;
    }
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::SET_COOKIE,
            format!(
                "token={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={TOKEN_COOKIE_MAX_AGE}",
                pair.access
            ),
        )
        .body(Body::from(body.to_string()))
        .map_err(|e| AuthError::Internal(e.into()))
}

/// Refresh and logout present the refresh token as `Authorization: Bearer`.
/// A missing header is a request-shape problem (400); a header that is
/// present but not bearer-shaped is treated as a bad token (401).
fn refresh_credential(headers: &HeaderMap) -> Result<String, AuthError> {
    if !headers.contains_key(header::AUTHORIZATION) {
        return Err(AuthError::NotEnoughData);
    }
    bearer_token(headers).ok_or(AuthError::InvalidToken)
}

/// Absent and empty fields are the same failure at this boundary.
fn required(field: &Option<String>) -> Result<&str, AuthError> {
    field
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::NotEnoughData)
}

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupRequest>,
) -> Result<Response, AuthError> {
    let email = required(&body.email)?;
    let password = required(&body.password)?;
    let name = required(&body.name)?;

    let (user, pair) =
        AuthService::signup(&state.db, &state.codec, email, password, name).await?;
    auth_response(Some(&user), &pair)
}

pub async fn signin(
    State(state): State<AppState>,
    Json(body): Json<SigninRequest>,
) -> Result<Response, AuthError> {
    let email = required(&body.email)?;
    let password = required(&body.password)?;

    let (user, pair) = AuthService::signin(&state.db, &state.codec, email, password).await?;
    auth_response(Some(&user), &pair)
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let token = refresh_credential(&headers)?;
    let pair = AuthService::rotate(&state.db, &state.codec, &token).await?;
    auth_response(None, &pair)
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AuthError> {
    let token = refresh_credential(&headers)?;
    AuthService::revoke(&state.db, &state.codec, &token).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::SET_COOKIE,
            "token=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
        )
        .body(Body::from(r#"{"message":"Logged out"}"#))
        .map_err(|e| AuthError::Internal(e.into()))
}

pub async fn me(user: AuthenticatedUser) -> Json<Value> {
    Json(json!({ "userData": UserData::from(&user.user) }))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, AuthError> {
    let current = required(&body.current_password)?;
    let new = required(&body.new_password)?;

    AuthService::change_password(&state.db, user.user.id, current, new).await?;
    Ok(Json(json!({ "message": "Password changed" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use uuid::Uuid;

    fn pair() -> TokenPair {
        TokenPair {
            access: "acc.token.value".into(),
            refresh: "ref.token.value".into(),
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@a.com".into(),
            password_hash: "hash".into(),
            name: "n".into(),
            role: "brand".into(),
            is_active: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issuance_sets_access_cookie_with_month_max_age() {
        let response = auth_response(Some(&user()), &pair()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("token=acc.token.value;"));
        assert!(cookie.contains("Max-Age=2592000"));
    }

    #[tokio::test]
    async fn issuance_body_carries_refresh_token_and_user_data() {
        let response = auth_response(Some(&user()), &pair()).unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["token"], json!("ref.token.value"));
        assert_eq!(body["userData"]["email"], json!("a@a.com"));
        assert_eq!(body["userData"]["isActive"], json!(false));
    }

    #[tokio::test]
    async fn refresh_body_has_no_user_data() {
        let response = auth_response(None, &pair()).unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["token"], json!("ref.token.value"));
        assert!(body.get("userData").is_none());
    }

    #[test]
    fn missing_authorization_is_not_enough_data() {
        let err = refresh_credential(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::NotEnoughData));
    }

    #[test]
    fn non_bearer_authorization_is_invalid_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Token abc"));
        let err = refresh_credential(&headers).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn bearer_authorization_yields_raw_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer ref.token.value"),
        );
        assert_eq!(refresh_credential(&headers).unwrap(), "ref.token.value");
    }

    #[test]
    fn absent_and_empty_fields_are_not_enough_data() {
        assert!(matches!(
            required(&None).unwrap_err(),
            AuthError::NotEnoughData
        ));
        assert!(matches!(
            required(&Some(String::new())).unwrap_err(),
            AuthError::NotEnoughData
        ));
        assert_eq!(required(&Some("x".into())).unwrap(), "x");
    }
}
