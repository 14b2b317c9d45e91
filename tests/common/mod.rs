//! Common test utilities for E2E tests

#![allow(dead_code)]

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;
use uuid::Uuid;
use wits::{AppState, config};

/// Credentials the stub identity provider accepts
pub const STUB_EMAIL: &str = "alice@example.com";
pub const STUB_PASSWORD: &str = "Secret123!";
/// Access token the stub identity provider hands out and recognizes
pub const STUB_ACCESS_TOKEN: &str = "provider-access-token";
/// Email the stub identity provider reports as already registered
pub const STUB_TAKEN_EMAIL: &str = "taken@example.com";
/// Email for which the stub identity provider fails with a server error
pub const STUB_BROKEN_EMAIL: &str = "broken@example.com";
const STUB_API_KEY: &str = "anon-key";

pub fn stub_user_id() -> Uuid {
    Uuid::from_u128(0x5eed_0000_0000_4000_8000_0000_0000_0001)
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Server with the local authenticator and an empty database
    pub async fn local() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir, "local", None);
        Self::start(config, temp_dir).await
    }

    /// Server with the remote authenticator talking to a stub provider
    pub async fn remote() -> Self {
        let provider_url = spawn_stub_provider().await;
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(
            &temp_dir,
            "remote",
            Some(config::RemoteAuthConfig {
                url: provider_url,
                secret: STUB_API_KEY.to_string(),
                callback_url: "http://localhost:3000/auth/callback".to_string(),
            }),
        );
        Self::start(config, temp_dir).await
    }

    async fn start(config: config::AppConfig, temp_dir: TempDir) -> Self {
        wits::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = wits::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// GET, optionally sending a session cookie
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// POST a form, optionally sending a session cookie
    pub async fn post_form(
        &self,
        path: &str,
        form: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).form(form);
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        request.send().await.unwrap()
    }

    /// POST a form the way a boosted htmx page submits it
    pub async fn post_htmx_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .unwrap()
    }

    /// Register through the form and return the session cookie
    pub async fn register(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form(
                "/register",
                &[
                    ("email", email),
                    ("password", password),
                    ("password-confirmation", password),
                ],
                None,
            )
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
        session_cookie(&response).expect("registration must set a session cookie")
    }

    /// Log in through the form and return the session cookie
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post_form("/login", &[("email", email), ("password", password)], None)
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::SEE_OTHER);
        session_cookie(&response).expect("login must set a session cookie")
    }
}

fn test_config(
    temp_dir: &TempDir,
    mode: &str,
    remote: Option<config::RemoteAuthConfig>,
) -> config::AppConfig {
    let public_dir = temp_dir.path().join("public");
    std::fs::create_dir_all(&public_dir).unwrap();
    std::fs::write(public_dir.join("app.css"), "body { margin: 0; }").unwrap();
    std::fs::write(public_dir.join("favicon.ico"), [0_u8, 0, 1, 0]).unwrap();

    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            public_dir,
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        auth: config::AuthConfig {
            mode: mode.to_string(),
            access_token_secret: "test-access-secret".to_string(),
            refresh_token_secret: "test-refresh-secret".to_string(),
            session_secret: "test-session-secret-32-bytes-long".to_string(),
            session_max_age: 3600,
            access_token_ttl: 3600,
            refresh_token_ttl: 3600,
            password_hash: config::PasswordHashConfig {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
            remote,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// `name=value` pair of a non-empty session cookie set by the response
pub fn session_cookie(response: &reqwest::Response) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .filter_map(|header| header.split(';').next().map(str::to_string))
        .find(|pair| {
            pair.strip_prefix(&format!("{}=", wits::auth::SESSION_COOKIE_NAME))
                .is_some_and(|value| !value.is_empty())
        })
}

/// Raw `Set-Cookie` headers of a response
pub fn set_cookie_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// `Location` header of a redirect
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

// =============================================================================
// Stub identity provider
// =============================================================================

#[derive(Deserialize)]
struct StubCredentials {
    email: String,
    password: String,
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers
        .get("apikey")
        .is_some_and(|value| value == STUB_API_KEY)
}

async fn stub_token(headers: HeaderMap, Json(body): Json<StubCredentials>) -> Response {
    if !has_api_key(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body.email == STUB_BROKEN_EMAIL {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if body.email != STUB_EMAIL || body.password != STUB_PASSWORD {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    Json(json!({
        "access_token": STUB_ACCESS_TOKEN,
        "refresh_token": "provider-refresh-token",
        "token_type": "bearer",
        "expires_in": 3600,
        "user": { "id": stub_user_id(), "email": STUB_EMAIL },
    }))
    .into_response()
}

async fn stub_signup(headers: HeaderMap, Json(body): Json<StubCredentials>) -> Response {
    if !has_api_key(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if body.email == STUB_BROKEN_EMAIL {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if body.email == STUB_TAKEN_EMAIL {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "msg": "User already registered" })),
        )
            .into_response();
    }

    Json(json!({ "id": Uuid::new_v4(), "email": body.email })).into_response()
}

async fn stub_user(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if !has_api_key(&headers) || bearer != Some(STUB_ACCESS_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    Json(json!({ "id": stub_user_id(), "email": STUB_EMAIL })).into_response()
}

/// Start a GoTrue-compatible stub and return its base URL
async fn spawn_stub_provider() -> String {
    let app = Router::new()
        .route("/auth/v1/token", post(stub_token))
        .route("/auth/v1/signup", post(stub_signup))
        .route("/auth/v1/user", get(stub_user));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}
