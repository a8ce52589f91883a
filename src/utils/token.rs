use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorMessage, HttpError};

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

pub fn create_token(
    user_id: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    if user_id.is_empty() {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidSubject.into());
    }

    let now = Utc::now();
    let iat = now.timestamp() as usize;
    let exp = (now + Duration::seconds(expires_in_seconds)).timestamp() as usize;
    let claims = TokenClaims {
        sub: user_id.to_string(),
        iat,
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
}

pub fn decode_token<T: Into<String>>(token: T, secret: &[u8]) -> Result<String, HttpError> {
    decode_with(token.into(), secret, Validation::new(Algorithm::HS256))
}

/// Verifies the signature only. Used by the realtime handshake, where a
/// long-lived socket keeps the identity it was opened with.
pub fn decode_token_ignoring_expiry<T: Into<String>>(
    token: T,
    secret: &[u8],
) -> Result<String, HttpError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.remove("exp");
    decode_with(token.into(), secret, validation)
}

fn decode_with(token: String, secret: &[u8], validation: Validation) -> Result<String, HttpError> {
    let decoded = decode::<TokenClaims>(&token, &DecodingKey::from_secret(secret), &validation);
    match decoded {
        Ok(token) => Ok(token.claims.sub),
        Err(_) => Err(HttpError::new(
            ErrorMessage::InvalidToken.to_string(),
            axum::http::StatusCode::UNAUTHORIZED,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn decodes_a_fresh_token() {
        let token = create_token("user-1", SECRET, 60).unwrap();
        assert_eq!(decode_token(token, SECRET).unwrap(), "user-1");
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let token = create_token("user-1", b"other-secret", 60).unwrap();
        assert!(decode_token(token.clone(), SECRET).is_err());
        assert!(decode_token_ignoring_expiry(token, SECRET).is_err());
    }

    #[test]
    fn expired_token_only_passes_the_lenient_decoder() {
        // Well past the default 60s leeway
        let token = create_token("user-1", SECRET, -3600).unwrap();
        assert!(decode_token(token.clone(), SECRET).is_err());
        assert_eq!(decode_token_ignoring_expiry(token, SECRET).unwrap(), "user-1");
    }

    #[test]
    fn refuses_an_empty_subject() {
        assert!(create_token("", SECRET, 60).is_err());
    }
}
