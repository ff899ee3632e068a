//! Business logic services for the site.
//!
//! # Services
//!
//! - `auth` - Sign-in/up/out and per-request admin resolution
//! - `gallery` - Visible gallery listing
//! - `moderation` - Pending queue, approve/reject, delete
//! - `upload` - Per-file validation and the upload pipeline
//! - `drafts` - Server-side staging of a batch (previews, crop)
//! - `admin_users` - User listing and admin-role toggling
//! - `hall_of_fame` - Profile listing, editing, locking
//!
//! Services borrow the backend (and any registry they need) from
//! [`AppState`](crate::state::AppState) for the duration of one request.

pub mod admin_users;
pub mod auth;
pub mod drafts;
pub mod gallery;
pub mod hall_of_fame;
pub mod moderation;
pub mod upload;

use crate::error::AppError;
use crate::models::SessionUser;
use auth::AuthContext;

/// Require a signed-in admin.
///
/// # Errors
///
/// `AppError::Unauthorized` without a user, `AppError::Forbidden` for a
/// non-admin.
pub fn require_admin(ctx: &AuthContext) -> Result<&SessionUser, AppError> {
    let user = ctx
        .user
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))?;
    if !ctx.is_admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(user)
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_require_admin() {
        assert_eq!(
            require_admin(&test_support::anonymous()).unwrap_err().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            require_admin(&test_support::ctx(false)).unwrap_err().status(),
            StatusCode::FORBIDDEN
        );
        assert!(require_admin(&test_support::ctx(true)).is_ok());
    }
}
