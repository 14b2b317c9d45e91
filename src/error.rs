//! Error types for Wits
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.
//! Form handlers intercept the authentication variants first and
//! render them inline instead (see [`AppError::form_message`]).

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Generic message shown for any rejected sign-in.
///
/// Unknown email, wrong password and provider rejections all share it.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "The credentials you have entered are invalid";

/// Message shown when a registration collides with an existing user.
pub const DUPLICATE_USER_MESSAGE: &str = "User with email already exists";

/// Message shown for upstream failures in form flows.
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Something went wrong, please try again later";

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Submitted form failed validation (200, rendered inline)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown email, wrong password or provider sign-in failure
    #[error("Invalid credentials")]
    CredentialsRejected,

    /// Registration for an email that already exists
    #[error("User already exists")]
    DuplicateUser,

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP client error talking to the identity provider (502)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Identity provider returned an unexpected response (502)
    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Encryption/signing error (500)
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// HTTP status used when this error terminates a request.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::CredentialsRejected | AppError::DuplicateUser => {
                StatusCode::OK
            }
            AppError::HttpClient(_) | AppError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::Encryption(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the `wits_errors_total` metric.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::CredentialsRejected => "credentials_rejected",
            AppError::DuplicateUser => "duplicate_user",
            AppError::Database(_) => "database",
            AppError::HttpClient(_) => "http_client",
            AppError::IdentityProvider(_) => "identity_provider",
            AppError::Config(_) => "config",
            AppError::Encryption(_) => "encryption",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether this error came from a failing dependency rather than the user.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::HttpClient(_)
                | AppError::IdentityProvider(_)
                | AppError::Encryption(_)
                | AppError::Internal(_)
        )
    }

    /// Message rendered next to a login or registration form.
    ///
    /// Never exposes internal details: upstream failures collapse into a
    /// single generic message.
    pub fn form_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::CredentialsRejected => INVALID_CREDENTIALS_MESSAGE.to_string(),
            AppError::DuplicateUser => DUPLICATE_USER_MESSAGE.to_string(),
            AppError::Config(msg) => msg.clone(),
            _ => UPSTREAM_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to an HTML error page
    fn into_response(self) -> Response {
        let status = self.status_code();

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[self.error_type()]).inc();

        if self.is_upstream() {
            tracing::error!(error = %self, "Request failed");
        }

        let message = match &self {
            AppError::NotFound | AppError::Unauthorized => self.to_string(),
            other => other.form_message(),
        };

        (status, Html(crate::web::views::error_page(status, &message))).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
