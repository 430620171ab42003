//! Credential token issue/verify.
//!
//! Tokens are HS256 JWTs embedding the [`Identity`] claims plus `iat`/`exp`.
//! Validity is determined purely by the signature and the embedded expiry;
//! there is no revocation list, so a verifier needs nothing beyond the
//! shared secret.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::TOKEN_VALIDITY_DAYS;
use crate::types::Identity;

#[derive(Error, Debug)]
pub enum TokenError {
    /// Missing, malformed, expired, and signature-invalid tokens all fold
    /// into this one case; callers must not distinguish them.
    #[error("Invalid or expired credential token")]
    Invalid,

    #[error("Token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id (standard JWT `sub` claim).
    sub: Uuid,
    username: String,
    email: String,
    /// Issued at (unix timestamp).
    iat: i64,
    /// Expiry (unix timestamp).
    exp: i64,
}

/// Sign a token for `identity`, valid for [`TOKEN_VALIDITY_DAYS`].
pub fn issue(identity: &Identity, secret: &str) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: identity.id,
        username: identity.username.clone(),
        email: identity.email.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::days(TOKEN_VALIDITY_DAYS)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Verify a raw token and recover the embedded identity.
///
/// Pure and stateless: depends only on the shared secret and the token's
/// own expiry.
pub fn verify(raw: &str, secret: &str) -> Result<Identity, TokenError> {
    let data = decode::<Claims>(
        raw,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| TokenError::Invalid)?;

    Ok(Identity {
        id: data.claims.sub,
        username: data.claims.username,
        email: data.claims.email,
    })
}
