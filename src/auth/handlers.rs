//! Login, registration and provider callback routes

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::backend::{AuthMode, LoginCredentials, Registration, RegistrationForm};
use super::remote::GOOGLE_PROVIDER;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::ERRORS_TOTAL;
use crate::web::redirect::{HX_REQUEST, hx_redirect, safe_return_target};
use crate::web::views;

/// Landing page after a successful login
const DEFAULT_RETURN_TARGET: &str = "/dashboard";

/// Create authentication router
///
/// Routes:
/// - GET/POST /login - Login form
/// - GET /login/provider/google - Redirect to the third-party provider
/// - POST /logout - Logout
/// - GET/POST /register - Registration form
/// - GET /auth/callback - Provider callback
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login))
        .route("/login/provider/google", get(google_login))
        .route("/logout", post(logout))
        .route("/register", get(register_page).post(register))
        .route("/auth/callback", get(auth_callback))
}

/// Turn an authentication error into the message and status for a form
///
/// htmx only swaps successful responses, so boosted submissions always get
/// `200` and the error status is kept for plain form posts.
fn form_error(headers: &HeaderMap, error: &AppError) -> (StatusCode, String) {
    if error.is_upstream() {
        ERRORS_TOTAL.with_label_values(&[error.error_type()]).inc();
        tracing::error!(%error, "Form submission failed");
    }
    let status = if headers.contains_key(HX_REQUEST) {
        StatusCode::OK
    } else {
        error.status_code()
    };
    (status, error.form_message())
}

// =============================================================================
// Login
// =============================================================================

#[derive(Debug, Deserialize)]
struct LoginQuery {
    to: Option<String>,
}

/// GET /login
async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Html<String> {
    let to = safe_return_target(query.to.as_deref(), DEFAULT_RETURN_TARGET);
    Html(views::login_form(
        "",
        to,
        None,
        state.auth.mode() == AuthMode::Remote,
    ))
}

#[derive(Deserialize)]
struct LoginSubmission {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    to: Option<String>,
}

/// POST /login
///
/// On success sets the session cookie and redirects to the return target.
/// Any failure re-renders the form with the submitted email.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(submission): Form<LoginSubmission>,
) -> Response {
    let to = safe_return_target(submission.to.as_deref(), DEFAULT_RETURN_TARGET).to_string();
    let credentials = LoginCredentials {
        email: submission.email,
        password: submission.password,
    };

    let result = match state.auth.login(&credentials).await {
        Ok(session) => state.sessions.open(&session),
        Err(error) => Err(error),
    };

    match result {
        Ok(cookie) => (jar.add(cookie), hx_redirect(&headers, &to)).into_response(),
        Err(error) => {
            let (status, message) = form_error(&headers, &error);
            let html = views::login_form(
                &credentials.email,
                &to,
                Some(&message),
                state.auth.mode() == AuthMode::Remote,
            );
            (status, Html(html)).into_response()
        }
    }
}

/// GET /login/provider/google
///
/// Redirects to the provider; the session is created later in the callback.
async fn google_login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let url = state.auth.provider_login(GOOGLE_PROVIDER)?;
    Ok(hx_redirect(&headers, url.as_str()))
}

// =============================================================================
// Logout
// =============================================================================

/// POST /logout
///
/// Always clears the session cookie, whether or not one was present.
async fn logout(State(state): State<AppState>, headers: HeaderMap, jar: CookieJar) -> Response {
    (jar.add(state.sessions.clear()), hx_redirect(&headers, "/login")).into_response()
}

// =============================================================================
// Registration
// =============================================================================

/// GET /register
async fn register_page() -> Html<String> {
    Html(views::register_form("", None))
}

/// POST /register
async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let result = match state.auth.register(&form).await {
        Ok(Registration::LoggedIn(session)) => state.sessions.open(&session),
        Ok(Registration::VerificationPending { email }) => {
            return Html(views::register_success(&email)).into_response();
        }
        Err(error) => Err(error),
    };

    match result {
        Ok(cookie) => {
            (jar.add(cookie), hx_redirect(&headers, DEFAULT_RETURN_TARGET)).into_response()
        }
        Err(error) => {
            let (status, message) = form_error(&headers, &error);
            (status, Html(views::register_form(&form.email, Some(&message)))).into_response()
        }
    }
}

// =============================================================================
// Provider callback
// =============================================================================

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    access_token: Option<String>,
}

/// GET /auth/callback
///
/// Without an `access_token` query parameter, serves the page that lifts
/// the token out of the URL fragment. With one, resolves the user at the
/// provider, sets the session cookie and redirects to `/`.
async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, AppError> {
    let Some(access_token) = query.access_token.filter(|token| !token.is_empty()) else {
        return Ok(Html(views::auth_callback_script()).into_response());
    };

    let session = state
        .auth
        .verify(&access_token)
        .await
        .map_err(|error| match error {
            AppError::CredentialsRejected => AppError::Unauthorized,
            other => other,
        })?;
    let cookie = state.sessions.open(&session)?;

    Ok((jar.add(cookie), hx_redirect(&headers, "/")).into_response())
}
