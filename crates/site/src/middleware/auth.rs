//! Authentication extractors.
//!
//! [`Viewer`] resolves the caller's [`AuthContext`] once per request and never
//! rejects. [`RequireAdmin`] additionally demands the admin flag: pages are
//! redirected (to `/auth` without a session, to `/` for a non-admin) and
//! `/api/*` requests get 401 or 403.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::{SessionUser, session_keys};
use crate::services::auth::{AuthContext, AuthService};
use crate::state::AppState;

/// The caller, signed in or not.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Viewer(ctx): Viewer) -> impl IntoResponse {
///     if ctx.is_admin { "admin" } else { "visitor" }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Viewer(pub AuthContext);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<AuthContext>() {
            return Ok(Self(ctx.clone()));
        }

        let ctx = match parts.extensions.get::<Session>() {
            Some(session) => AuthService::new(state.backend()).resolve(session).await?,
            None => AuthContext::anonymous(),
        };
        parts.extensions.insert(ctx.clone());
        Ok(Self(ctx))
    }
}

/// A signed-in admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthContext);

/// Why [`RequireAdmin`] refused the request.
#[derive(Debug)]
pub enum AdminRejection {
    /// No session on a page: go sign in.
    RedirectToAuth,
    /// Signed in but not an admin on a page: go home.
    RedirectHome,
    Unauthorized,
    Forbidden,
    Failed(AppError),
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToAuth => Redirect::to("/auth").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Unauthorized => AppError::Unauthorized("Sign in required".to_string()).into_response(),
            Self::Forbidden => AppError::Forbidden("Admin access required".to_string()).into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Viewer(ctx) = Viewer::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Failed)?;

        // Nested routers see the path without their prefix.
        let is_api = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0)
            .path()
            .starts_with("/api/");
        match (ctx.is_signed_in(), ctx.is_admin, is_api) {
            (true, true, _) => Ok(Self(ctx)),
            (false, _, false) => Err(AdminRejection::RedirectToAuth),
            (true, false, false) => Err(AdminRejection::RedirectHome),
            (false, _, true) => Err(AdminRejection::Unauthorized),
            (true, false, true) => Err(AdminRejection::Forbidden),
        }
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &SessionUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    set_sentry_user(&user.id, user.email.as_deref());
    Ok(())
}

/// Remove the signed-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<SessionUser>(session_keys::CURRENT_USER)
        .await?;
    clear_sentry_user();
    Ok(())
}
