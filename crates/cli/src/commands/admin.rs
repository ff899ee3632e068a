//! Admin role management.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap the first admin
//! classfete-cli admin grant alice@example.com
//!
//! classfete-cli admin revoke alice@example.com
//! classfete-cli admin list
//! ```
//!
//! The user must already have signed up on the site.

use classfete_core::{Email, Role, UserId};
use classfete_site::backend::{Backend, BackendError};

use super::CliError;

async fn find_user<B: Backend>(backend: &B, email: &str) -> Result<UserId, CliError> {
    let wanted = Email::parse(email).map_err(|e| CliError::Invalid(format!("{email}: {e}")))?;
    backend
        .list_auth_users()
        .await?
        .into_iter()
        .find(|u| {
            u.email
                .as_deref()
                .is_some_and(|e| e.eq_ignore_ascii_case(wanted.as_str()))
        })
        .map(|u| u.id)
        .ok_or_else(|| CliError::UserNotFound(wanted.into_inner()))
}

/// Grant the admin role.
///
/// Granting to a user who is already admin is not an error.
///
/// # Errors
///
/// Returns [`CliError::UserNotFound`] for an unknown email.
pub async fn grant<B: Backend>(backend: &B, email: &str) -> Result<UserId, CliError> {
    let user_id = find_user(backend, email).await?;
    match backend.insert_role(user_id, Role::Admin).await {
        Ok(()) => tracing::info!(%user_id, email, "admin role granted"),
        Err(BackendError::Conflict(_)) => tracing::info!(%user_id, email, "already an admin"),
        Err(e) => return Err(e.into()),
    }
    Ok(user_id)
}

/// Revoke the admin role.
///
/// # Errors
///
/// Returns [`CliError::UserNotFound`] for an unknown email.
pub async fn revoke<B: Backend>(backend: &B, email: &str) -> Result<UserId, CliError> {
    let user_id = find_user(backend, email).await?;
    backend.delete_role(user_id, Role::Admin).await?;
    tracing::info!(%user_id, email, "admin role revoked");
    Ok(user_id)
}

/// Emails of every admin; users without an email are listed by id.
///
/// # Errors
///
/// Returns an error if either listing fails.
pub async fn list<B: Backend>(backend: &B) -> Result<Vec<String>, CliError> {
    let admins = backend.list_role_holders(Role::Admin).await?;
    let users = backend.list_auth_users().await?;

    let mut names: Vec<String> = admins
        .iter()
        .map(|id| {
            users
                .iter()
                .find(|u| u.id == *id)
                .and_then(|u| u.email.clone())
                .unwrap_or_else(|| id.to_string())
        })
        .collect();
    names.sort();

    tracing::info!("{} admin(s)", names.len());
    for name in &names {
        tracing::info!("  {name}");
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use classfete_site::backend::MemoryBackend;

    use super::*;

    async fn backend_with_user(email: &str) -> MemoryBackend {
        let backend = MemoryBackend::new("http://localhost:3000", "gallery-images");
        backend
            .sign_up(&Email::parse(email).unwrap(), "secret1")
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_grant_list_revoke() {
        let backend = backend_with_user("alice@example.com").await;

        let id = grant(&backend, "Alice@Example.com").await.unwrap();
        assert!(backend.has_role(id, Role::Admin).await.unwrap());
        grant(&backend, "alice@example.com").await.unwrap();

        assert_eq!(list(&backend).await.unwrap(), vec!["alice@example.com"]);

        revoke(&backend, "alice@example.com").await.unwrap();
        assert!(list(&backend).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let backend = backend_with_user("alice@example.com").await;
        assert!(matches!(
            grant(&backend, "bob@example.com").await,
            Err(CliError::UserNotFound(_))
        ));
        assert!(matches!(
            grant(&backend, "not an email").await,
            Err(CliError::Invalid(_))
        ));
    }
}
