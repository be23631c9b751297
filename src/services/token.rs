use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::{canonical_timestamp, Claims, TokenKind, TokenPair};

#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("wrong token kind")]
    WrongKind,
    #[error("encoding failed: {0}")]
    Encoding(String),
}

/// Signs and verifies the HS256 token pair. The `created` claim carries the
/// session marker the pair was issued against; the codec itself is stateless.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_days: i64,
}

impl TokenCodec {
    pub fn new(secret: &str, access_ttl_seconds: u64, refresh_ttl_days: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_seconds: access_ttl_seconds as i64,
            refresh_ttl_days: refresh_ttl_days as i64,
        }
    }

    /// Issue an access + refresh pair sharing one session marker. Access
    /// tokens are never re-issued on their own; they always ride along with
    /// a refresh token minted here.
    pub fn issue_pair(&self, user_id: Uuid, marker: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        let created = canonical_timestamp(marker);
        Ok(TokenPair {
            access: self.encode(user_id, &created, TokenKind::Access)?,
            refresh: self.encode(user_id, &created, TokenKind::Refresh)?,
        })
    }

    fn ttl_seconds(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_days * 86400,
        }
    }

    pub fn encode(
        &self,
        user_id: Uuid,
        created: &str,
        kind: TokenKind,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            created: created.to_string(),
            token_type: kind,
            iat: now as usize,
            exp: (now + self.ttl_seconds(kind)) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature, expiry, and kind, then hand back the claims.
    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token past its exp is dead, full stop.
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.token_type != expected {
            return Err(TokenError::WrongKind);
        }
        Ok(data.claims)
    }
}
