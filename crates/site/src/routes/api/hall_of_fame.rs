//! Hall-of-fame endpoints.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;

use classfete_core::ProfileId;

use super::uploads::read_upload_form;
use crate::backend::{NewProfile, Profile};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, Viewer};
use crate::services::hall_of_fame::{HallOfFameService, ProfileEdit};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Profile>>> {
    Ok(Json(HallOfFameService::new(state.backend()).list().await?))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Json(profile): Json<NewProfile>,
) -> Result<(StatusCode, Json<Profile>)> {
    let profile = HallOfFameService::new(state.backend())
        .create(&ctx, profile)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path(id): Path<ProfileId>,
    Json(edit): Json<ProfileEdit>,
) -> Result<Json<Profile>> {
    let profile = HallOfFameService::new(state.backend())
        .edit(&ctx, id, edit)
        .await?;
    Ok(Json(profile))
}

/// Store a replacement image. The returned URL is saved by a following edit.
pub async fn upload_image(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path(id): Path<ProfileId>,
    multipart: Multipart,
) -> Result<Json<ImageUrl>> {
    let form = read_upload_form(multipart).await?;
    let mut files = form.files.into_iter();
    let (Some(file), None) = (files.next(), files.next()) else {
        return Err(AppError::BadRequest("Send exactly one image".to_string()));
    };
    let url = HallOfFameService::new(state.backend())
        .upload_image(&ctx, id, file)
        .await?;
    Ok(Json(ImageUrl { url }))
}

pub async fn toggle_lock(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Path(id): Path<ProfileId>,
) -> Result<Json<Profile>> {
    let profile = HallOfFameService::new(state.backend())
        .toggle_lock(&ctx, id)
        .await?;
    Ok(Json(profile))
}
