//! Remote (delegated) authenticator
//!
//! Credentials are checked by an external identity provider. The
//! provider's tokens are kept in the session as-is.

use std::sync::Arc;

use url::Url;

use super::backend::{LoginCredentials, Registration, RegistrationForm};
use super::provider::IdentityProvider;
use super::session::{SessionData, SessionStore};
use crate::data::normalize_email;
use crate::error::AppError;

/// Third-party login provider offered on the login page
pub const GOOGLE_PROVIDER: &str = "google";

/// Authentication delegated to an [`IdentityProvider`]
#[derive(Clone)]
pub struct RemoteAuthenticator {
    provider: Arc<dyn IdentityProvider>,
    sessions: SessionStore,
    callback_url: String,
}

impl RemoteAuthenticator {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        sessions: SessionStore,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            sessions,
            callback_url: callback_url.into(),
        }
    }

    /// Sign in with the provider and start a session holding its tokens
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionData, AppError> {
        let email = normalize_email(&credentials.email);
        let signed_in = self.provider.sign_in(&email, &credentials.password).await?;

        Ok(self.sessions.start(
            signed_in.user.id,
            signed_in.user.email,
            signed_in.access_token,
            Some(signed_in.refresh_token),
        ))
    }

    /// Create the user at the provider
    ///
    /// No session is started; the user must confirm their email first.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Registration, AppError> {
        form.check_confirmation()?;

        let email = normalize_email(&form.email);
        let created = self.provider.sign_up(&email, &form.password).await?;

        tracing::info!(provider_user_id = %created.id, "Registration pending email verification");

        Ok(Registration::VerificationPending { email })
    }

    /// URL that starts a third-party login and returns to the callback
    pub fn provider_login(&self, provider: &str) -> Result<Url, AppError> {
        self.provider.authorize_url(provider, &self.callback_url)
    }

    /// Start a session from a provider-issued access token
    pub async fn verify(&self, access_token: &str) -> Result<SessionData, AppError> {
        let user = self.provider.user(access_token).await?;

        Ok(self
            .sessions
            .start(user.id, user.email, access_token.to_string(), None))
    }
}
