//! Admin user management.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use classfete_core::{Role, UserId};

use super::auth::AuthContext;
use super::require_admin;
use crate::backend::Backend;
use crate::error::AppError;
use crate::inflight::InFlight;

/// Shown for identities without an email.
pub const NO_EMAIL: &str = "No email";

/// One row of the admin user list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub is_admin: bool,
}

pub struct AdminUserService<'a, B> {
    backend: &'a B,
    in_flight: &'a InFlight<UserId>,
}

impl<'a, B: Backend> AdminUserService<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B, in_flight: &'a InFlight<UserId>) -> Self {
        Self { backend, in_flight }
    }

    /// Every auth identity with its admin flag.
    ///
    /// # Errors
    ///
    /// Returns an authorization error for non-admins, or `AppError::Backend`
    /// when the identity listing fails. A role-table failure is not an error.
    #[instrument(skip_all)]
    pub async fn list_users(&self, ctx: &AuthContext) -> Result<Vec<UserSummary>, AppError> {
        require_admin(ctx)?;
        self.fetch().await
    }

    /// Grant or revoke the admin role, then return the refreshed list.
    ///
    /// # Errors
    ///
    /// `Conflict` while a toggle for the same user is running, plus the
    /// errors of [`Self::list_users`].
    #[instrument(skip(self, ctx), fields(admin_id = ?ctx.user_id()))]
    pub async fn toggle_admin(
        &self,
        ctx: &AuthContext,
        user_id: UserId,
        currently_admin: bool,
    ) -> Result<Vec<UserSummary>, AppError> {
        require_admin(ctx)?;
        let guard = self
            .in_flight
            .try_acquire(user_id)
            .ok_or_else(|| AppError::Conflict("This user is already being updated".to_string()))?;

        if currently_admin {
            self.backend.delete_role(user_id, Role::Admin).await?;
            tracing::info!(%user_id, "admin role revoked");
        } else {
            self.backend.insert_role(user_id, Role::Admin).await?;
            tracing::info!(%user_id, "admin role granted");
        }
        drop(guard);

        self.fetch().await
    }

    async fn fetch(&self) -> Result<Vec<UserSummary>, AppError> {
        let users = self.backend.list_auth_users().await?;
        let admins: HashSet<UserId> = match self.backend.list_role_holders(Role::Admin).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(error = %e, "role table read failed, listing without admins");
                HashSet::new()
            }
        };

        Ok(users
            .into_iter()
            .map(|user| UserSummary {
                is_admin: admins.contains(&user.id),
                id: user.id,
                email: user.email.unwrap_or_else(|| NO_EMAIL.to_string()),
                created_at: user.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use classfete_core::Email;

    use super::*;
    use crate::backend::{MemoryBackend, SignUpOutcome};
    use crate::services::test_support::{backend, ctx};

    async fn user(backend: &MemoryBackend, email: &str) -> UserId {
        let email = Email::parse(email).unwrap();
        match backend.sign_up(&email, "secret1").await.unwrap() {
            SignUpOutcome::SignedIn(session) => session.user.id,
            SignUpOutcome::ConfirmationRequired(user) => user.id,
        }
    }

    fn flag(users: &[UserSummary], id: UserId) -> bool {
        users.iter().find(|u| u.id == id).unwrap().is_admin
    }

    #[tokio::test]
    async fn test_toggle_round_trip() {
        let backend = backend();
        let registry = InFlight::new();
        let service = AdminUserService::new(&backend, &registry);
        let admin = ctx(true);
        let target = user(&backend, "t@example.com").await;

        let before = service.list_users(&admin).await.unwrap();
        assert!(!flag(&before, target));

        let granted = service.toggle_admin(&admin, target, false).await.unwrap();
        assert!(flag(&granted, target));
        let revoked = service.toggle_admin(&admin, target, true).await.unwrap();
        assert!(!flag(&revoked, target));
        assert_eq!(revoked, before);
    }

    #[tokio::test]
    async fn test_role_read_failure_lists_without_admins() {
        let backend = backend();
        let registry = InFlight::new();
        let service = AdminUserService::new(&backend, &registry);
        let target = user(&backend, "t@example.com").await;
        backend.insert_role(target, Role::Admin).await.unwrap();

        backend.fail_role_reads(true);
        let users = service.list_users(&ctx(true)).await.unwrap();
        assert!(!flag(&users, target));
    }

    #[tokio::test]
    async fn test_non_admin_refused() {
        let backend = backend();
        let registry = InFlight::new();
        let service = AdminUserService::new(&backend, &registry);
        let target = user(&backend, "t@example.com").await;

        let err = service.toggle_admin(&ctx(false), target, false).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(!backend.has_role(target, Role::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_toggle_conflicts() {
        let backend = backend();
        let registry = InFlight::new();
        let service = AdminUserService::new(&backend, &registry);
        let target = user(&backend, "t@example.com").await;

        let _held = registry.try_acquire(target).unwrap();
        let err = service.toggle_admin(&ctx(true), target, false).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }
}
