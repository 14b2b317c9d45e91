//! Wits - email/password and delegated authentication for a server-rendered web app
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Web Layer (Axum)                        │
//! │  - Login / registration / callback handlers                 │
//! │  - resolve_user + require_auth middleware                   │
//! │  - Server-rendered pages                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Authentication Backend                      │
//! │  - Local: credential store + self-issued tokens             │
//! │  - Remote: delegated identity provider                      │
//! │  - Encrypted session cookie                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx): users + accounts                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `auth`: Authenticators, tokens, sessions and middleware
//! - `web`: Pages, redirects and the metrics endpoint
//! - `data`: Credential store
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod web;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request. Every process-wide dependency
/// lives here; there are no globals besides the metrics registry.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Credential store
    pub db: Arc<data::Database>,

    /// Authenticator selected from `auth.mode`
    pub auth: Arc<auth::AuthBackend>,

    /// Session cookie sealing
    pub sessions: auth::SessionStore,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build the session store
    /// 3. Select the authentication backend, with an HTTP client for the
    ///    identity provider in remote mode
    ///
    /// # Errors
    /// Returns error if any initialization step fails. An unset or
    /// invalid `auth.mode` fails here, before any request is served.
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let mode = config.auth.mode()?;

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Session store
        let sessions = auth::SessionStore::new(
            &config.auth.session_secret,
            config.auth.session_max_age,
            config.should_use_secure_cookies(),
        );

        // 3. Authentication backend
        let identity_provider = match (&mode, &config.auth.remote) {
            (auth::AuthMode::Remote, Some(remote)) => {
                let http_client = reqwest::Client::builder()
                    .user_agent(concat!("Wits/", env!("CARGO_PKG_VERSION")))
                    .timeout(std::time::Duration::from_secs(30))
                    .build()
                    .map_err(|e| error::AppError::Internal(e.into()))?;
                Some(Arc::new(auth::GoTrueClient::new(http_client, remote)?)
                    as Arc<dyn auth::IdentityProvider>)
            }
            _ => None,
        };
        let backend = auth::select_backend(
            mode,
            &config.auth,
            auth::BackendDeps {
                db: db.clone(),
                sessions: sessions.clone(),
                identity_provider,
            },
        )?;

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            auth: Arc::new(backend),
            sessions,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{
        compression::CompressionLayer,
        services::{ServeDir, ServeFile},
        trace::TraceLayer,
    };

    let public_dir = state.config.server.public_dir.clone();

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(web::pages_router())
        .merge(auth::auth_router())
        .merge(web::protected_router())
        .nest_service("/public", ServeDir::new(&public_dir))
        .route_service("/favicon.ico", ServeFile::new(public_dir.join("favicon.ico")))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::resolve_user,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(web::metrics::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
