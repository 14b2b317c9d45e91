//! Delegated identity provider client
//!
//! Speaks the GoTrue REST API (the auth service behind Supabase):
//! - `POST /auth/v1/token?grant_type=password` - password sign-in
//! - `POST /auth/v1/signup` - registration (sends a confirmation email)
//! - `GET  /auth/v1/user` - resolve an access token to a user
//! - `GET  /auth/v1/authorize` - third-party (OAuth) login redirect

use axum::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::RemoteAuthConfig;
use crate::error::AppError;

/// User identity as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderUser {
    pub id: uuid::Uuid,
    #[serde(default)]
    pub email: String,
}

/// Tokens and user returned by a successful sign-in
#[derive(Clone, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: ProviderUser,
}

impl std::fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSession")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Remote identity service
///
/// Implementations must be safe to share between concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify email and password with the provider
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AppError>;

    /// Create a user; the provider follows up with a verification email
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, AppError>;

    /// Resolve a provider-issued access token to its user
    async fn user(&self, access_token: &str) -> Result<ProviderUser, AppError>;

    /// URL that starts a third-party login with `provider`
    fn authorize_url(&self, provider: &str, redirect_to: &str) -> Result<Url, AppError>;
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Sign-up responses are either the bare user or `{ "user": ... }`
/// depending on whether email confirmation is enabled.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Wrapped { user: ProviderUser },
    Bare(ProviderUser),
}

/// HTTP client for a GoTrue-compatible identity service
pub struct GoTrueClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl GoTrueClient {
    /// Create a client from configuration
    ///
    /// # Errors
    /// Returns `AppError::Config` if the service URL is invalid.
    pub fn new(http_client: reqwest::Client, config: &RemoteAuthConfig) -> Result<Self, AppError> {
        let mut base_url = Url::parse(&config.url)
            .map_err(|e| AppError::Config(format!("auth.remote.url is invalid: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http_client,
            base_url,
            api_key: config.secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::Config(format!("invalid identity provider endpoint: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .header("apikey", &self.api_key)
    }
}

async fn upstream_error(operation: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(%status, operation, "Identity provider request failed");
    tracing::debug!(body = %body, operation, "Identity provider error body");
    AppError::IdentityProvider(format!("{operation} failed with HTTP {status}"))
}

fn is_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNPROCESSABLE_ENTITY
    )
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession, AppError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&Credentials { email, password })
            .send()
            .await?;

        if is_rejection(response.status()) {
            tracing::info!(status = %response.status(), "Identity provider rejected sign-in");
            return Err(AppError::CredentialsRejected);
        }
        if !response.status().is_success() {
            return Err(upstream_error("sign-in", response).await);
        }

        Ok(response.json::<ProviderSession>().await?)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, AppError> {
        let url = self.endpoint("auth/v1/signup")?;

        let response = self
            .request(reqwest::Method::POST, url)
            .json(&Credentials { email, password })
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNPROCESSABLE_ENTITY => return Err(AppError::DuplicateUser),
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                tracing::info!(body = %body, "Identity provider rejected sign-up");
                return Err(AppError::Validation(
                    "The email or password was not accepted".to_string(),
                ));
            }
            _ => return Err(upstream_error("sign-up", response).await),
        }

        let user = match response.json::<SignUpResponse>().await? {
            SignUpResponse::Wrapped { user } | SignUpResponse::Bare(user) => user,
        };
        Ok(user)
    }

    async fn user(&self, access_token: &str) -> Result<ProviderUser, AppError> {
        let url = self.endpoint("auth/v1/user")?;

        let response = self
            .request(reqwest::Method::GET, url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if is_rejection(response.status()) {
            return Err(AppError::CredentialsRejected);
        }
        if !response.status().is_success() {
            return Err(upstream_error("user lookup", response).await);
        }

        Ok(response.json::<ProviderUser>().await?)
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> Result<Url, AppError> {
        let mut url = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to);
        Ok(url)
    }
}
