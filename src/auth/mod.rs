//! Authentication
//!
//! Handles:
//! - Local email/password authentication with self-issued tokens
//! - Delegated authentication through a remote identity provider
//! - Encrypted session cookies
//! - User resolution and route protection middleware

mod backend;
mod handlers;
mod local;
mod middleware;
pub mod password;
pub mod provider;
mod remote;
pub mod session;
pub mod token;
mod user;

pub use backend::{
    AuthBackend, AuthMode, BackendDeps, LoginCredentials, PASSWORD_MISMATCH_MESSAGE, Registration,
    RegistrationForm, select_backend,
};
pub use handlers::auth_router;
pub use local::LocalAuthenticator;
pub use middleware::{CurrentUser, require_auth, resolve_user};
pub use provider::{GoTrueClient, IdentityProvider, ProviderSession, ProviderUser};
pub use remote::{GOOGLE_PROVIDER, RemoteAuthenticator};
pub use session::{SESSION_COOKIE_NAME, SessionData, SessionStore};
pub use token::{Claims, TokenIssuer, TokenPair, sign_token, verify_token};
pub use user::AuthenticatedUser;
