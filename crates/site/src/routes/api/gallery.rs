//! Gallery and moderation endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use classfete_core::GalleryItemId;

use crate::backend::GalleryItem;
use crate::error::Result;
use crate::middleware::{RequireAdmin, Viewer};
use crate::services::gallery::GalleryService;
use crate::services::moderation::ModerationService;
use crate::state::AppState;

pub async fn index(State(state): State<AppState>, Viewer(ctx): Viewer) -> Result<Json<Vec<GalleryItem>>> {
    let items = GalleryService::new(state.backend()).list(&ctx).await?;
    Ok(Json(items))
}

pub async fn pending(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
) -> Result<Json<Vec<GalleryItem>>> {
    let items = ModerationService::new(state.backend(), state.moderation_in_flight())
        .list_pending(&ctx)
        .await?;
    Ok(Json(items))
}

pub async fn approve(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Path(id): Path<GalleryItemId>,
) -> Result<Json<GalleryItem>> {
    let item = ModerationService::new(state.backend(), state.moderation_in_flight())
        .approve(&ctx, id)
        .await?;
    Ok(Json(item))
}

pub async fn reject(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Path(id): Path<GalleryItemId>,
) -> Result<Json<GalleryItem>> {
    let item = ModerationService::new(state.backend(), state.moderation_in_flight())
        .reject(&ctx, id)
        .await?;
    Ok(Json(item))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Path(id): Path<GalleryItemId>,
) -> Result<StatusCode> {
    ModerationService::new(state.backend(), state.moderation_in_flight())
        .delete(&ctx, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
