//! Server-rendered pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::backend::{GalleryItem, Profile};
use crate::error::AppError;
use crate::middleware::{RequireAdmin, Viewer};
use crate::models::session_keys;
use crate::routes::api::uploads::read_upload_form;
use crate::services::admin_users::{AdminUserService, UserSummary};
use crate::services::auth::SessionView;
use crate::services::gallery::GalleryService;
use crate::services::hall_of_fame::HallOfFameService;
use crate::services::moderation::ModerationService;
use crate::services::upload::UploadService;
use crate::state::AppState;

/// Seconds the intro plays before moving on.
pub const INTRO_SECONDS: u32 = 6;

/// Toast messages carried in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Redirect to `path` with a toast message.
#[must_use]
pub fn redirect_with(path: &str, kind: &str, message: &str) -> Response {
    let sep = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!("{path}{sep}{kind}={}", urlencoding::encode(message))).into_response()
}

#[derive(Template, WebTemplate)]
#[template(path = "intro.html")]
pub struct IntroTemplate {
    pub seconds: u32,
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub viewer: SessionView,
    pub gallery: Vec<GalleryItem>,
    pub profiles: Vec<Profile>,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "moderation.html")]
pub struct ModerationTemplate {
    pub viewer: SessionView,
    pub pending: Vec<GalleryItem>,
    pub users: Vec<UserSummary>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Home page, preceded by the intro once per session.
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    Viewer(ctx): Viewer,
    Query(query): Query<MessageQuery>,
) -> Result<Response, AppError> {
    if !session
        .get::<bool>(session_keys::INTRO_SEEN)
        .await?
        .unwrap_or(false)
    {
        return Ok(IntroTemplate {
            seconds: INTRO_SECONDS,
        }
        .into_response());
    }

    let mut error = query.error;
    let gallery = GalleryService::new(state.backend())
        .list(&ctx)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "gallery load failed");
            error.get_or_insert_with(|| e.public_message());
            Vec::new()
        });
    let profiles = HallOfFameService::new(state.backend())
        .list()
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "hall of fame load failed");
            error.get_or_insert_with(|| e.public_message());
            Vec::new()
        });

    Ok(HomeTemplate {
        viewer: ctx.view(),
        gallery,
        profiles,
        error,
        success: query.success,
    }
    .into_response())
}

/// Mark the intro as seen and continue to the home page.
pub async fn intro_complete(session: Session) -> Result<Redirect, AppError> {
    session.insert(session_keys::INTRO_SEEN, true).await?;
    Ok(Redirect::to("/"))
}

/// Moderation dashboard: pending uploads and user roles.
pub async fn moderation(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pending = ModerationService::new(state.backend(), state.moderation_in_flight())
        .list_pending(&ctx)
        .await?;
    let users = AdminUserService::new(state.backend(), state.role_in_flight())
        .list_users(&ctx)
        .await?;

    Ok(ModerationTemplate {
        viewer: ctx.view(),
        pending,
        users,
        error: query.error,
        success: query.success,
    })
}

/// Moderation actions posted from the dashboard without JavaScript.
#[derive(Debug, Deserialize)]
pub struct ModerationForm {
    pub id: classfete_core::GalleryItemId,
    pub decision: classfete_core::ModerationDecision,
}

/// Apply a moderation decision and return to the dashboard.
pub async fn moderation_action(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Form(form): Form<ModerationForm>,
) -> Response {
    match ModerationService::new(state.backend(), state.moderation_in_flight())
        .decide(&ctx, form.id, form.decision)
        .await
    {
        Ok(item) => redirect_with("/moderation", "success", &format!("Marked as {}", item.status)),
        Err(e) => redirect_with("/moderation", "error", &e.public_message()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub user_id: classfete_core::UserId,
    #[serde(default)]
    pub currently_admin: bool,
}

/// Grant or revoke admin from the dashboard.
pub async fn role_action(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Form(form): Form<RoleForm>,
) -> Response {
    match AdminUserService::new(state.backend(), state.role_in_flight())
        .toggle_admin(&ctx, form.user_id, form.currently_admin)
        .await
    {
        Ok(_) => redirect_with("/moderation", "success", "Role updated"),
        Err(e) => redirect_with("/moderation", "error", &e.public_message()),
    }
}

/// Upload form fallback for browsers without JavaScript.
pub async fn upload(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    multipart: Multipart,
) -> Response {
    let form = match read_upload_form(multipart).await {
        Ok(form) => form,
        Err(e) => return redirect_with("/", "error", &e.public_message()),
    };
    match UploadService::new(state.backend())
        .upload(
            &ctx,
            form.title.as_deref(),
            form.description.as_deref(),
            form.files,
        )
        .await
    {
        Ok(report) if report.uploaded() > 0 => redirect_with("/", "success", &report.summary()),
        Ok(report) => redirect_with("/", "error", &report.summary()),
        Err(e) => redirect_with("/", "error", &e.public_message()),
    }
}
