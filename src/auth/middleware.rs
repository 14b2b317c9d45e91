//! Authentication middleware
//!
//! `resolve_user` runs on every request and attaches an
//! [`AuthenticatedUser`] (possibly anonymous) to the request extensions.
//! `require_auth` guards the protected route group.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::user::AuthenticatedUser;
use crate::AppState;
use crate::web::redirect::hx_redirect;

/// Path prefixes that never need a user
const SKIPPED_PREFIXES: [&str; 2] = ["/public", "/favicon.ico"];

fn is_skipped(path: &str) -> bool {
    SKIPPED_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Middleware that resolves the current user from the session cookie
///
/// Identity only ever comes from the sealed session. A failing account
/// lookup is logged and the request continues without account data.
///
/// # Usage
/// ```ignore
/// let app = Router::new()
///     .route("/", ...)
///     .layer(middleware::from_fn_with_state(state, resolve_user));
/// ```
pub async fn resolve_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if is_skipped(request.uri().path()) {
        return next.run(request).await;
    }

    let user = match state.sessions.read(&jar) {
        Some(session) if state.auth.session_is_valid(&session) => {
            let mut user = AuthenticatedUser::from_session(&session);
            match state.db.get_account_by_user_id(user.id).await {
                Ok(account) => user.account = account,
                Err(error) => {
                    tracing::warn!(%error, user_id = %user.id, "Failed to load account");
                }
            }
            user
        }
        Some(session) => {
            tracing::debug!(email = %session.email, "Session token no longer valid");
            AuthenticatedUser::anonymous()
        }
        None => AuthenticatedUser::anonymous(),
    };

    request.extensions_mut().insert(user);
    next.run(request).await
}

/// Middleware to require a logged-in user
///
/// Anonymous visitors are sent to `/login?to=<requested path>`.
pub async fn require_auth(request: Request, next: Next) -> Response {
    let logged_in = request
        .extensions()
        .get::<AuthenticatedUser>()
        .is_some_and(|user| user.logged_in);

    if !logged_in {
        let to = format!("/login?to={}", request.uri().path());
        tracing::debug!(path = %request.uri().path(), "Redirecting anonymous visitor to login");
        return hx_redirect(request.headers(), &to);
    }

    next.run(request).await
}

/// Extractor for the user resolved by [`resolve_user`]
///
/// Falls back to an anonymous user when the middleware did not run.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .unwrap_or_default();
        Ok(CurrentUser(user))
    }
}
