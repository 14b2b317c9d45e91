//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

use crate::auth::AuthMode;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "wits.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
    /// Directory served under `/public`
    pub public_dir: PathBuf,
}

impl ServerConfig {
    /// Get the base URL for the instance
    ///
    /// # Returns
    /// Full URL like "https://wits.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Backend selector: "local" or "remote"
    #[serde(default)]
    pub mode: String,
    /// Secret for signing access tokens
    pub access_token_secret: String,
    /// Secret for signing refresh tokens (must differ from the access secret)
    pub refresh_token_secret: String,
    /// Session cookie encryption secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 3600)
    pub session_max_age: i64,
    /// Access token lifetime in seconds (default: 3600)
    pub access_token_ttl: i64,
    /// Refresh token lifetime in seconds (default: 3600)
    pub refresh_token_ttl: i64,
    #[serde(default)]
    pub password_hash: PasswordHashConfig,
    /// Delegated identity provider, required when mode = "remote"
    pub remote: Option<RemoteAuthConfig>,
}

impl AuthConfig {
    /// Parse the backend selector.
    pub fn mode(&self) -> Result<AuthMode, crate::error::AppError> {
        self.mode.parse()
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordHashConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Delegated identity provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAuthConfig {
    /// Base URL of the identity service (e.g. "https://project.supabase.co")
    pub url: String,
    /// Service API key sent with every request
    pub secret: String,
    /// Where the third-party provider sends the browser after login
    pub callback_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (WITS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("server.public_dir", "public")?
            .set_default("database.path", "data/wits.db")?
            .set_default("auth.session_max_age", 3600)?
            .set_default("auth.access_token_ttl", 3600)?
            .set_default("auth.refresh_token_ttl", 3600)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (WITS__*)
            .add_source(
                Environment::with_prefix("WITS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        use crate::error::AppError;

        const MIN_SESSION_SECRET_BYTES: usize = 32;

        let mode = self.auth.mode()?;

        if self.auth.access_token_secret.is_empty() || self.auth.refresh_token_secret.is_empty() {
            return Err(AppError::Config(
                "auth.access_token_secret and auth.refresh_token_secret must be set".to_string(),
            ));
        }

        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(AppError::Config(
                "auth.access_token_secret and auth.refresh_token_secret must differ".to_string(),
            ));
        }

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        for (name, value) in [
            ("auth.session_max_age", self.auth.session_max_age),
            ("auth.access_token_ttl", self.auth.access_token_ttl),
            ("auth.refresh_token_ttl", self.auth.refresh_token_ttl),
        ] {
            if value <= 0 {
                return Err(AppError::Config(format!("{name} must be greater than 0")));
            }
        }

        if mode == AuthMode::Remote {
            let remote = self.auth.remote.as_ref().ok_or_else(|| {
                AppError::Config("auth.remote is required when auth.mode=remote".to_string())
            })?;
            url::Url::parse(&remote.url)
                .map_err(|e| AppError::Config(format!("auth.remote.url is invalid: {e}")))?;
            url::Url::parse(&remote.callback_url).map_err(|e| {
                AppError::Config(format!("auth.remote.callback_url is invalid: {e}"))
            })?;
        }

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_end_matches('.').to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
