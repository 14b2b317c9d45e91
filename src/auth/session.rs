//! Session management
//!
//! The whole session lives in one encrypted cookie (`wits-session`).
//! No server-side session storage needed.
//!
//! Cookie value: `base64url(nonce || AES-256-GCM(json))`. The GCM tag
//! authenticates the payload, so a tampered or foreign cookie decodes to
//! "no session" rather than to attacker-chosen values.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "wits-session";

const AES_GCM_NONCE_BYTES: usize = 12;

/// Values stored in the session cookie
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub access_token: String,
    /// Absent when the session was opened from a provider callback
    pub refresh_token: Option<String>,
    pub email: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for SessionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionData")
            .field("email", &self.email)
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl SessionData {
    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Seals sessions into cookies and opens them again
#[derive(Clone)]
pub struct SessionStore {
    key: [u8; 32],
    max_age: Duration,
    secure: bool,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store whose encryption key is derived from `secret`
    ///
    /// # Arguments
    /// * `secret` - Server-held session secret
    /// * `max_age_seconds` - Cookie and session lifetime
    /// * `secure` - Whether to set the `Secure` cookie attribute
    pub fn new(secret: &str, max_age_seconds: i64, secure: bool) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self {
            key,
            max_age: Duration::seconds(max_age_seconds),
            secure,
        }
    }

    /// Build session data for a user who just authenticated
    pub fn start(
        &self,
        user_id: Uuid,
        email: impl Into<String>,
        access_token: String,
        refresh_token: Option<String>,
    ) -> SessionData {
        let now = Utc::now();
        SessionData {
            access_token,
            refresh_token,
            email: email.into(),
            user_id,
            created_at: now,
            expires_at: now + self.max_age,
        }
    }

    /// Seal a session into its `Set-Cookie` form
    pub fn open(&self, session: &SessionData) -> Result<Cookie<'static>, AppError> {
        let value = self.seal(session)?;
        Ok(Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(self.max_age.num_seconds()))
            .build())
    }

    /// Read the session from the request cookies
    ///
    /// Missing, undecryptable and expired sessions all yield `None`.
    pub fn read(&self, jar: &CookieJar) -> Option<SessionData> {
        let cookie = jar.get(SESSION_COOKIE_NAME)?;
        let session = self.unseal(cookie.value())?;
        if session.is_expired() {
            tracing::debug!(email = %session.email, "Session expired");
            return None;
        }
        Some(session)
    }

    /// Cookie that invalidates any existing session
    ///
    /// Empty value, immediate expiry.
    pub fn clear(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build();
        cookie.make_removal();
        cookie
    }

    fn seal(&self, session: &SessionData) -> Result<String, AppError> {
        let payload = serde_json::to_vec(session).map_err(|e| AppError::Internal(e.into()))?;
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|_| AppError::Encryption("invalid session key length".to_string()))?;

        let mut nonce = [0_u8; AES_GCM_NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), payload.as_slice())
            .map_err(|_| AppError::Encryption("session encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(AES_GCM_NONCE_BYTES + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    fn unseal(&self, value: &str) -> Option<SessionData> {
        let data = URL_SAFE_NO_PAD.decode(value).ok()?;
        if data.len() <= AES_GCM_NONCE_BYTES {
            return None;
        }

        let cipher = Aes256Gcm::new_from_slice(&self.key).ok()?;
        let (nonce, ciphertext) = data.split_at(AES_GCM_NONCE_BYTES);
        let payload = match cipher.decrypt(Nonce::from_slice(nonce), ciphertext) {
            Ok(payload) => payload,
            Err(_) => {
                tracing::debug!("Rejected session cookie that failed authentication");
                return None;
            }
        };

        serde_json::from_slice(&payload).ok()
    }
}
