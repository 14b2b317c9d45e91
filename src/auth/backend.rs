//! Authentication backend selection
//!
//! The backend is chosen once at startup from `auth.mode` and stays fixed
//! for the life of the process. Handlers talk to [`AuthBackend`] and never
//! branch on the mode themselves.

use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use url::Url;

use super::local::LocalAuthenticator;
use super::password::PasswordHasher;
use super::provider::IdentityProvider;
use super::remote::RemoteAuthenticator;
use super::session::{SessionData, SessionStore};
use super::token::TokenIssuer;
use crate::config::AuthConfig;
use crate::data::Database;
use crate::error::AppError;
use crate::metrics::{SESSIONS_OPENED_TOTAL, observe_auth_attempt};

/// Message for the password confirmation check
pub const PASSWORD_MISMATCH_MESSAGE: &str = "The passwords do not match";

/// Which authenticator family serves the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Local,
    Remote,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::Local => "local",
            AuthMode::Remote => "remote",
        }
    }
}

impl FromStr for AuthMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(AuthMode::Local),
            "remote" => Ok(AuthMode::Remote),
            _ => Err(AppError::Config(
                "auth.mode not set or invalid (expected \"local\" or \"remote\")".to_string(),
            )),
        }
    }
}

/// Submitted login form
#[derive(Clone, Deserialize)]
pub struct LoginCredentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Submitted registration form
#[derive(Clone, Deserialize)]
pub struct RegistrationForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirmation")]
    pub password_confirmation: String,
}

impl RegistrationForm {
    /// Reject the form when the two password fields differ
    pub fn check_confirmation(&self) -> Result<(), AppError> {
        if self.password != self.password_confirmation {
            return Err(AppError::Validation(PASSWORD_MISMATCH_MESSAGE.to_string()));
        }
        Ok(())
    }
}

/// Outcome of a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// User exists and is logged in
    LoggedIn(SessionData),
    /// User must follow the emailed link before logging in
    VerificationPending { email: String },
}

/// Collaborators needed to build either backend
pub struct BackendDeps {
    pub db: Arc<Database>,
    pub sessions: SessionStore,
    /// Required in remote mode
    pub identity_provider: Option<Arc<dyn IdentityProvider>>,
}

/// The authenticator serving this process
#[derive(Clone)]
pub enum AuthBackend {
    Local(LocalAuthenticator),
    Remote(RemoteAuthenticator),
}

/// Build the backend for `mode`
///
/// # Errors
/// Returns `AppError::Config` when remote mode lacks a provider or its
/// settings, or when the password hashing parameters are invalid.
pub fn select_backend(
    mode: AuthMode,
    config: &AuthConfig,
    deps: BackendDeps,
) -> Result<AuthBackend, AppError> {
    let backend = match mode {
        AuthMode::Local => AuthBackend::Local(LocalAuthenticator::new(
            deps.db,
            PasswordHasher::new(&config.password_hash)?,
            TokenIssuer::new(config),
            deps.sessions,
        )),
        AuthMode::Remote => {
            let remote = config.remote.as_ref().ok_or_else(|| {
                AppError::Config("auth.remote is required when auth.mode=remote".to_string())
            })?;
            let provider = deps.identity_provider.ok_or_else(|| {
                AppError::Config("identity provider is not configured".to_string())
            })?;
            AuthBackend::Remote(RemoteAuthenticator::new(
                provider,
                deps.sessions,
                remote.callback_url.clone(),
            ))
        }
    };

    tracing::info!(mode = mode.as_str(), "Authentication backend selected");
    Ok(backend)
}

fn delegated_login_unavailable() -> AppError {
    AppError::Config("Third-party login is not available".to_string())
}

impl AuthBackend {
    pub fn mode(&self) -> AuthMode {
        match self {
            AuthBackend::Local(_) => AuthMode::Local,
            AuthBackend::Remote(_) => AuthMode::Remote,
        }
    }

    /// Verify credentials and start a session
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionData, AppError> {
        let result = match self {
            AuthBackend::Local(local) => local.login(credentials).await,
            AuthBackend::Remote(remote) => remote.login(credentials).await,
        };
        self.observe("login", &result);
        if result.is_ok() {
            SESSIONS_OPENED_TOTAL
                .with_label_values(&[self.mode().as_str()])
                .inc();
        }
        result
    }

    /// Register a new user
    pub async fn register(&self, form: &RegistrationForm) -> Result<Registration, AppError> {
        let result = match self {
            AuthBackend::Local(local) => local.register(form).await,
            AuthBackend::Remote(remote) => remote.register(form).await,
        };
        self.observe("register", &result);
        if let Ok(Registration::LoggedIn(_)) = &result {
            SESSIONS_OPENED_TOTAL
                .with_label_values(&[self.mode().as_str()])
                .inc();
        }
        result
    }

    /// Where to send the browser for a third-party login
    pub fn provider_login(&self, provider: &str) -> Result<Url, AppError> {
        match self {
            AuthBackend::Local(_) => Err(delegated_login_unavailable()),
            AuthBackend::Remote(remote) => remote.provider_login(provider),
        }
    }

    /// Start a session from a provider-issued access token
    pub async fn verify(&self, access_token: &str) -> Result<SessionData, AppError> {
        let result = match self {
            AuthBackend::Local(_) => Err(delegated_login_unavailable()),
            AuthBackend::Remote(remote) => remote.verify(access_token).await,
        };
        self.observe("verify", &result);
        if result.is_ok() {
            SESSIONS_OPENED_TOTAL
                .with_label_values(&[self.mode().as_str()])
                .inc();
        }
        result
    }

    /// Check that a session read from the cookie is still backed by a valid token
    ///
    /// Only the local backend can check its own tokens; provider tokens are
    /// trusted for the life of the sealed session.
    pub fn session_is_valid(&self, session: &SessionData) -> bool {
        match self {
            AuthBackend::Local(local) => match local.tokens().verify_access(&session.access_token) {
                Ok(claims) => claims.email == session.email,
                Err(_) => false,
            },
            AuthBackend::Remote(_) => true,
        }
    }

    fn observe<T>(&self, operation: &str, result: &Result<T, AppError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(error) if error.is_upstream() => "error",
            Err(_) => "rejected",
        };
        observe_auth_attempt(self.mode().as_str(), operation, outcome);
    }
}
