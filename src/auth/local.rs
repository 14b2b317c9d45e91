//! Local authenticator
//!
//! Verifies credentials against the application's own user table and
//! mints its own access and refresh tokens.

use std::sync::Arc;

use super::backend::{LoginCredentials, Registration, RegistrationForm};
use super::password::PasswordHasher;
use super::session::{SessionData, SessionStore};
use super::token::TokenIssuer;
use super::user::AuthenticatedUser;
use crate::data::{Account, Database, User, normalize_email};
use crate::error::AppError;

/// Email and password authentication backed by the credential store
#[derive(Clone)]
pub struct LocalAuthenticator {
    db: Arc<Database>,
    hasher: PasswordHasher,
    tokens: TokenIssuer,
    sessions: SessionStore,
}

impl LocalAuthenticator {
    pub fn new(
        db: Arc<Database>,
        hasher: PasswordHasher,
        tokens: TokenIssuer,
        sessions: SessionStore,
    ) -> Self {
        Self {
            db,
            hasher,
            tokens,
            sessions,
        }
    }

    /// Token issuer, also used to re-check access tokens on each request
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Check email and password and start a session
    ///
    /// # Errors
    /// Returns `AppError::CredentialsRejected` for an unknown email and for a
    /// wrong password alike.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<SessionData, AppError> {
        let email = normalize_email(&credentials.email);

        let Some(user) = self.db.get_user_by_email(&email).await? else {
            self.hasher.equalize_timing(&credentials.password).await;
            tracing::info!(email = %email, "Login for unknown email");
            return Err(AppError::CredentialsRejected);
        };

        let Some(hash) = user.password_hash.as_deref() else {
            self.hasher.equalize_timing(&credentials.password).await;
            tracing::info!(user_id = %user.id, "Login for user without a local password");
            return Err(AppError::CredentialsRejected);
        };

        if !self.hasher.verify(&credentials.password, hash).await? {
            tracing::info!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::CredentialsRejected);
        }

        self.start_session(&user)
    }

    /// Create a user and its account, then log the new user in
    ///
    /// # Errors
    /// - `AppError::Validation` if the password confirmation differs
    /// - `AppError::DuplicateUser` if the email is taken
    pub async fn register(&self, form: &RegistrationForm) -> Result<Registration, AppError> {
        form.check_confirmation()?;

        let email = normalize_email(&form.email);
        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateUser);
        }

        let hash = self.hasher.hash(&form.password).await?;
        let user = User::new(&email, hash);
        let account = Account::for_user(&user);
        self.db.create_user_with_account(&user, &account).await?;

        tracing::info!(user_id = %user.id, "User registered");

        let session = self.start_session(&user)?;
        Ok(Registration::LoggedIn(session))
    }

    fn start_session(&self, user: &User) -> Result<SessionData, AppError> {
        let identity = AuthenticatedUser::logged_in(user.id, user.email.clone());
        let pair = self.tokens.issue_pair(&identity)?;

        Ok(self.sessions.start(
            user.id,
            user.email.clone(),
            pair.access_token,
            Some(pair.refresh_token),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordHashConfig;
    use tempfile::TempDir;

    async fn authenticator() -> (LocalAuthenticator, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let config = crate::config::tests::valid_config();
        let hasher = PasswordHasher::new(&PasswordHashConfig {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let auth = LocalAuthenticator::new(
            db.clone(),
            hasher,
            TokenIssuer::new(&config.auth),
            SessionStore::new(&config.auth.session_secret, 3600, false),
        );
        (auth, db, temp_dir)
    }

    fn form(email: &str, password: &str, confirmation: &str) -> RegistrationForm {
        RegistrationForm {
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: confirmation.to_string(),
        }
    }

    fn credentials(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (auth, db, _temp) = authenticator().await;

        let registration = auth
            .register(&form("alice@example.com", "Secret123!", "Secret123!"))
            .await
            .unwrap();
        let Registration::LoggedIn(session) = registration else {
            panic!("local registration must log the user in");
        };
        assert_eq!(session.email, "alice@example.com");
        assert!(session.refresh_token.is_some());

        let user = db.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        let account = db.get_account_by_user_id(user.id).await.unwrap().unwrap();
        assert_eq!(account.username, "alice");
        assert_ne!(user.password_hash.as_deref(), Some("Secret123!"));

        let session = auth
            .login(&credentials("Alice@Example.com", "Secret123!"))
            .await
            .unwrap();
        assert_eq!(session.user_id, user.id);

        let claims = auth.tokens().verify_access(&session.access_token).unwrap();
        assert_eq!(claims.email, "alice@example.com");
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_fail_alike() {
        let (auth, _db, _temp) = authenticator().await;
        auth.register(&form("alice@example.com", "Secret123!", "Secret123!"))
            .await
            .unwrap();

        let wrong_password = auth
            .login(&credentials("alice@example.com", "wrong"))
            .await
            .unwrap_err();
        let unknown_email = auth
            .login(&credentials("nobody@example.com", "Secret123!"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, AppError::CredentialsRejected));
        assert!(matches!(unknown_email, AppError::CredentialsRejected));
        assert_eq!(wrong_password.form_message(), unknown_email.form_message());
    }

    #[tokio::test]
    async fn mismatched_confirmation_writes_nothing() {
        let (auth, db, _temp) = authenticator().await;

        let error = auth
            .register(&form("bob@example.com", "Secret123!", "Secret124!"))
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::Validation(ref msg) if msg == "The passwords do not match"));
        assert_eq!(db.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (auth, db, _temp) = authenticator().await;
        auth.register(&form("alice@example.com", "Secret123!", "Secret123!"))
            .await
            .unwrap();

        let error = auth
            .register(&form("ALICE@example.com", "Other123!", "Other123!"))
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::DuplicateUser));
        assert_eq!(db.count_users().await.unwrap(), 1);
    }
}
