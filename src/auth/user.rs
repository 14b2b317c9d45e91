//! Request-scoped view of the current user

use uuid::Uuid;

use super::session::SessionData;
use crate::data::Account;

/// The user resolved for a single request
///
/// Never persisted. Rebuilt on every request from the session cookie,
/// or left as [`AuthenticatedUser::anonymous`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub logged_in: bool,
    pub account: Option<Account>,
}

impl AuthenticatedUser {
    /// A visitor without a valid session
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A freshly authenticated user, before any session exists
    pub fn logged_in(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
            logged_in: true,
            account: None,
        }
    }

    /// Rebuild the user from a session that has already been unsealed
    pub fn from_session(session: &SessionData) -> Self {
        Self::logged_in(session.user_id, session.email.clone())
    }

    /// Display name, falling back to the email address
    pub fn display_name(&self) -> &str {
        self.account
            .as_ref()
            .map(|account| account.username.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}
