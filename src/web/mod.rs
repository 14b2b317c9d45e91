//! Pages outside the authentication flow
//!
//! `/` is public; `/dashboard` and `/settings` form the protected group.

pub mod metrics;
pub mod redirect;
pub mod views;

use axum::{Router, middleware, response::Html, routing::get};

use crate::AppState;
use crate::auth::{CurrentUser, require_auth};

/// Public pages
pub fn pages_router() -> Router<AppState> {
    Router::new().route("/", get(home))
}

/// Pages that need a logged-in user
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/settings", get(settings))
        .route_layer(middleware::from_fn(require_auth))
}

/// GET /
async fn home(CurrentUser(user): CurrentUser) -> Html<String> {
    Html(views::home(&user))
}

/// GET /dashboard
async fn dashboard(CurrentUser(user): CurrentUser) -> Html<String> {
    Html(views::dashboard(&user))
}

/// GET /settings
async fn settings(CurrentUser(user): CurrentUser) -> Html<String> {
    Html(views::settings(&user))
}
