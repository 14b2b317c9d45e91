//! Access and refresh token issuance
//!
//! Tokens are compact HS256 JWTs: `header.claims.signature`, each part
//! base64url without padding. They are stateless; validity depends only
//! on the signature and the `exp` claim.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::user::AuthenticatedUser;
use crate::config::AuthConfig;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Fixed validity window used by [`sign_token`], in seconds
pub const TOKEN_VALIDITY_SECONDS: i64 = 60 * 60;

const TOKEN_ALGORITHM: &str = "HS256";

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration (Unix seconds)
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Sign a token for `user` that expires one hour from now
///
/// # Errors
/// Fails if the secret is empty or the claims cannot be encoded.
pub fn sign_token(user: &AuthenticatedUser, secret: &str) -> Result<String, AppError> {
    sign_token_with_ttl(user, secret, Duration::seconds(TOKEN_VALIDITY_SECONDS))
}

/// Sign a token for `user` with a custom lifetime
pub fn sign_token_with_ttl(
    user: &AuthenticatedUser,
    secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    if secret.is_empty() {
        return Err(AppError::Encryption(
            "token signing secret must not be empty".to_string(),
        ));
    }

    let now = Utc::now();
    let claims = Claims {
        email: user.email.clone(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let header = Header {
        alg: TOKEN_ALGORITHM.to_string(),
        typ: "JWT".to_string(),
    };

    let header_b64 = encode_part(&header)?;
    let claims_b64 = encode_part(&claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = new_mac(secret)?;
    mac.update(signing_input.as_bytes());
    let signature_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify a token's signature and expiry and return its claims
///
/// # Errors
/// Returns `AppError::Unauthorized` for malformed, forged or expired tokens.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(AppError::Unauthorized);
    };

    let header: Header = decode_part(header_b64)?;
    if header.alg != TOKEN_ALGORITHM {
        return Err(AppError::Unauthorized);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let mut mac = new_mac(secret)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let claims: Claims = decode_part(claims_b64)?;
    if claims.exp <= Utc::now().timestamp() {
        return Err(AppError::Unauthorized);
    }

    Ok(claims)
}

fn new_mac(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Encryption(e.to_string()))
}

fn encode_part<T: Serialize>(value: &T) -> Result<String, AppError> {
    let json = serde_json::to_vec(value).map_err(|e| AppError::Internal(e.into()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_part<T: serde::de::DeserializeOwned>(part: &str) -> Result<T, AppError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| AppError::Unauthorized)?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::Unauthorized)
}

/// Access and refresh token minted on login
#[derive(Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Mints token pairs with distinct secrets for access and refresh
#[derive(Clone)]
pub struct TokenIssuer {
    access_secret: String,
    refresh_secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.access_token_secret.clone(),
            refresh_secret: config.refresh_token_secret.clone(),
            access_ttl: Duration::seconds(config.access_token_ttl),
            refresh_ttl: Duration::seconds(config.refresh_token_ttl),
        }
    }

    /// Mint an access token and a refresh token for `user`
    pub fn issue_pair(&self, user: &AuthenticatedUser) -> Result<TokenPair, AppError> {
        let access_token = sign_token_with_ttl(user, &self.access_secret, self.access_ttl)?;
        let refresh_token = sign_token_with_ttl(user, &self.refresh_secret, self.refresh_ttl)?;

        tracing::debug!(email = %user.email, "Token pair issued");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Verify a token minted as an access token
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        verify_token(token, &self.access_secret)
    }

    /// Verify a token minted as a refresh token
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        verify_token(token, &self.refresh_secret)
    }
}
