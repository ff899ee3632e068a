//! Authentication route handlers.
//!
//! Sign-in, sign-up and sign-out against the backend's email/password auth.
//! Every outcome is a redirect carrying an `error` or `success` message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::middleware::{Viewer, clear_current_user, set_current_user};
use crate::routes::pages::redirect_with;
use crate::services::auth::{AuthService, SessionView, SignUpResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub mode: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Which form the auth page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    fn from_query(mode: Option<&str>) -> Self {
        match mode {
            Some("register") => Self::Register,
            _ => Self::Login,
        }
    }

    #[must_use]
    pub const fn is_register(self) -> bool {
        matches!(self, Self::Register)
    }

    const fn page(self) -> &'static str {
        match self {
            Self::Login => "/auth",
            Self::Register => "/auth?mode=register",
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "auth.html")]
pub struct AuthTemplate {
    pub viewer: SessionView,
    pub mode: AuthMode,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Display the login or sign-up form.
pub async fn auth_page(Viewer(ctx): Viewer, Query(query): Query<AuthQuery>) -> Response {
    if ctx.is_signed_in() {
        return Redirect::to("/").into_response();
    }
    AuthTemplate {
        viewer: ctx.view(),
        mode: AuthMode::from_query(query.mode.as_deref()),
        error: query.error,
        success: query.success,
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let page = AuthMode::Login.page();
    match AuthService::new(state.backend())
        .sign_in(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!(error = %e, "failed to store session");
                return redirect_with(page, "error", "Could not start your session");
            }
            redirect_with("/", "success", "Signed in")
        }
        Err(e) => {
            tracing::info!(error = %e, "login failed");
            redirect_with(page, "error", &e.public_message())
        }
    }
}

/// Handle sign-up form submission.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let page = AuthMode::Register.page();
    match AuthService::new(state.backend())
        .sign_up(&form.email, &form.password)
        .await
    {
        Ok(SignUpResult::SignedIn(user)) => {
            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!(error = %e, "failed to store session");
                return redirect_with(page, "error", "Could not start your session");
            }
            redirect_with("/", "success", "Account created")
        }
        Ok(SignUpResult::ConfirmationRequired) => redirect_with(
            AuthMode::Login.page(),
            "success",
            "Check your email to confirm your account",
        ),
        Err(e) => {
            tracing::info!(error = %e, "registration failed");
            redirect_with(page, "error", &e.public_message())
        }
    }
}

/// Handle logout.
///
/// The backend session is revoked best effort; the local session is cleared
/// regardless.
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    Viewer(ctx): Viewer,
) -> Response {
    if let Some(user) = &ctx.user {
        if let Err(e) = AuthService::new(state.backend()).sign_out(user).await {
            tracing::warn!(error = %e, "backend sign-out failed");
        }
    }
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "failed to clear session");
        return redirect_with("/", "error", "Could not sign out");
    }
    redirect_with("/", "success", "Signed out")
}
