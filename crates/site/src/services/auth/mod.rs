//! Authentication service.
//!
//! Wraps the backend's email/password auth and derives the admin flag from
//! the role table. The flag is recomputed on every resolution and never
//! stored in the session.

mod error;

pub use error::AuthError;

use chrono::Utc;
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use classfete_core::{Email, Role, UserId, validate_password};

use crate::backend::{Backend, BackendError, SignUpOutcome};
use crate::models::{SessionUser, session_keys};

/// Who is making the request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub user: Option<SessionUser>,
    pub is_admin: bool,
}

impl AuthContext {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user: None,
            is_admin: false,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.user.as_ref().map(|u| u.id)
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Token-free view for the browser.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            user: self.user.as_ref().map(|u| ViewerInfo {
                id: u.id,
                email: u.email.clone(),
            }),
            is_admin: self.is_admin,
        }
    }
}

/// Serialized form of [`AuthContext`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub user: Option<ViewerInfo>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewerInfo {
    pub id: UserId,
    pub email: Option<String>,
}

/// Result of a sign-up attempt.
#[derive(Debug)]
pub enum SignUpResult {
    SignedIn(SessionUser),
    /// Account created; the user must confirm their email before signing in.
    ConfirmationRequired,
}

/// Authentication service.
pub struct AuthService<'a, B> {
    backend: &'a B,
}

impl<'a, B: Backend> AuthService<'a, B> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` or `AuthError::WeakPassword` before
    /// any network call, `AuthError::InvalidCredentials` when the backend
    /// rejects the pair.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionUser, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let session = self.backend.sign_in(&email, password).await?;
        tracing::info!(user_id = %session.user.id, "user signed in");
        Ok(SessionUser::from(session))
    }

    /// Register with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if the email is taken, or a
    /// validation error before any network call.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpResult, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        match self.backend.sign_up(&email, password).await? {
            SignUpOutcome::SignedIn(session) => {
                tracing::info!(user_id = %session.user.id, "user signed up");
                Ok(SignUpResult::SignedIn(SessionUser::from(session)))
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                tracing::info!(user_id = %user.id, "user signed up, confirmation pending");
                Ok(SignUpResult::ConfirmationRequired)
            }
        }
    }

    /// Revoke the user's backend session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the auth service call fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn sign_out(&self, user: &SessionUser) -> Result<(), AuthError> {
        self.backend
            .sign_out(&user.access_token)
            .await
            .map_err(AuthError::Backend)
    }

    /// Whether `user_id` holds the admin role.
    ///
    /// A failed lookup counts as "not admin".
    pub async fn is_admin(&self, user_id: UserId) -> bool {
        match self.backend.has_role(user_id, Role::Admin).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "role lookup failed, treating as non-admin");
                false
            }
        }
    }

    /// Resolve the [`AuthContext`] for the current request.
    ///
    /// Refreshes the access token when it is about to expire. A refresh the
    /// backend rejects signs the user out locally.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    pub async fn resolve(&self, session: &Session) -> Result<AuthContext, AuthError> {
        let Some(mut user) = session
            .get::<SessionUser>(session_keys::CURRENT_USER)
            .await?
        else {
            return Ok(AuthContext::anonymous());
        };

        if user.needs_refresh(Utc::now()) {
            match self.backend.refresh_session(&user.refresh_token).await {
                Ok(fresh) => {
                    user = SessionUser::from(fresh);
                    session.insert(session_keys::CURRENT_USER, &user).await?;
                    tracing::debug!(user_id = %user.id, "access token refreshed");
                }
                Err(BackendError::Unauthorized(reason) | BackendError::NotFound(reason)) => {
                    tracing::info!(user_id = %user.id, %reason, "refresh rejected, signing out");
                    session
                        .remove::<SessionUser>(session_keys::CURRENT_USER)
                        .await?;
                    return Ok(AuthContext::anonymous());
                }
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "token refresh failed");
                }
            }
        }

        let is_admin = self.is_admin(user.id).await;
        Ok(AuthContext {
            user: Some(user),
            is_admin,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::backend::MemoryBackend;

    fn backend() -> MemoryBackend {
        MemoryBackend::new("http://localhost:3000", "gallery-images")
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        let backend = backend();
        let auth = AuthService::new(&backend);

        assert!(matches!(
            auth.sign_in("not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.sign_up("a@b.co", "12345").await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(backend.list_auth_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let backend = backend();
        let auth = AuthService::new(&backend);

        let SignUpResult::SignedIn(user) = auth.sign_up("a@b.co", "secret1").await.unwrap() else {
            panic!("memory backend signs in immediately");
        };
        let again = auth.sign_in(" a@b.co ", "secret1").await.unwrap();
        assert_eq!(user.id, again.id);

        assert!(matches!(
            auth.sign_in("a@b.co", "wrong-pass").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.sign_up("a@b.co", "secret1").await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_resolve_derives_admin_from_role_table() {
        let backend = backend();
        let auth = AuthService::new(&backend);
        let session = session();

        assert!(!auth.resolve(&session).await.unwrap().is_signed_in());

        let SignUpResult::SignedIn(user) = auth.sign_up("a@b.co", "secret1").await.unwrap() else {
            panic!("expected session");
        };
        session.insert(session_keys::CURRENT_USER, &user).await.unwrap();

        let ctx = auth.resolve(&session).await.unwrap();
        assert!(ctx.is_signed_in());
        assert!(!ctx.is_admin);

        backend.insert_role(user.id, Role::Admin).await.unwrap();
        assert!(auth.resolve(&session).await.unwrap().is_admin);

        backend.delete_role(user.id, Role::Admin).await.unwrap();
        assert!(!auth.resolve(&session).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_role_lookup_failure_fails_closed() {
        let backend = backend();
        let auth = AuthService::new(&backend);
        let user_id = UserId::random();
        backend.insert_role(user_id, Role::Admin).await.unwrap();

        backend.fail_role_reads(true);
        assert!(!auth.is_admin(user_id).await);
        backend.fail_role_reads(false);
        assert!(auth.is_admin(user_id).await);
    }

    #[tokio::test]
    async fn test_resolve_refreshes_expiring_token() {
        let backend = backend();
        backend.set_token_ttl(TimeDelta::seconds(5));
        let auth = AuthService::new(&backend);
        let session = session();

        let SignUpResult::SignedIn(user) = auth.sign_up("a@b.co", "secret1").await.unwrap() else {
            panic!("expected session");
        };
        session.insert(session_keys::CURRENT_USER, &user).await.unwrap();
        backend.set_token_ttl(TimeDelta::hours(1));

        let ctx = auth.resolve(&session).await.unwrap();
        let refreshed = ctx.user.unwrap();
        assert_ne!(refreshed.refresh_token, user.refresh_token);

        let stored: SessionUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.refresh_token, refreshed.refresh_token);
    }

    #[tokio::test]
    async fn test_rejected_refresh_signs_out() {
        let backend = backend();
        backend.set_token_ttl(TimeDelta::seconds(5));
        let auth = AuthService::new(&backend);
        let session = session();

        let SignUpResult::SignedIn(mut user) = auth.sign_up("a@b.co", "secret1").await.unwrap()
        else {
            panic!("expected session");
        };
        user.refresh_token = "revoked".to_string();
        session.insert(session_keys::CURRENT_USER, &user).await.unwrap();

        let ctx = auth.resolve(&session).await.unwrap();
        assert!(!ctx.is_signed_in());
        assert!(
            session
                .get::<SessionUser>(session_keys::CURRENT_USER)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_view_has_no_tokens() {
        let ctx = AuthContext {
            user: Some(SessionUser {
                id: UserId::random(),
                email: None,
                access_token: "tok-a".to_string(),
                refresh_token: "tok-r".to_string(),
                expires_at: Utc::now(),
            }),
            is_admin: true,
        };
        let json = serde_json::to_string(&ctx.view()).unwrap();
        assert!(!json.contains("tok-"));
        assert!(json.contains("\"is_admin\":true"));
    }
}
