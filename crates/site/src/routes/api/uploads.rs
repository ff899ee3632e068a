//! Upload endpoints: one-shot batches and staged drafts.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use classfete_core::DraftId;

use crate::error::{AppError, Result};
use crate::media::CropRect;
use crate::middleware::Viewer;
use crate::services::drafts::DraftView;
use crate::services::upload::{BatchReport, StagedFile, UploadService, check_submission};
use crate::state::AppState;

/// Fallback media type when the browser sends none.
const OCTET_STREAM: &str = "application/octet-stream";

/// Fields of an upload form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub files: Vec<StagedFile>,
}

/// Read a multipart upload form.
///
/// File parts may be named `file` or `files`; `title` and `description` are
/// text parts. Unknown parts are skipped. Empty file inputs are ignored.
///
/// # Errors
///
/// `BadRequest` when the body is not valid multipart.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm> {
    let bad = |e: axum::extract::multipart::MultipartError| AppError::BadRequest(e.body_text());
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        match field.name().unwrap_or_default() {
            "title" => form.title = Some(field.text().await.map_err(bad)?),
            "description" => form.description = Some(field.text().await.map_err(bad)?),
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or(OCTET_STREAM).to_owned();
                let bytes = field.bytes().await.map_err(bad)?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.files.push(StagedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            other => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }
    Ok(form)
}

/// Validate and upload in one request.
pub async fn upload(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    multipart: Multipart,
) -> Result<Json<BatchReport>> {
    let form = read_upload_form(multipart).await?;
    let report = UploadService::new(state.backend())
        .upload(
            &ctx,
            form.title.as_deref(),
            form.description.as_deref(),
            form.files,
        )
        .await?;
    Ok(Json(report))
}

pub async fn create_draft(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    multipart: Multipart,
) -> Result<(StatusCode, Json<DraftView>)> {
    let form = read_upload_form(multipart).await?;
    let view = state.drafts().create(&ctx, form.files).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn show_draft(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path(id): Path<DraftId>,
) -> Result<Json<DraftView>> {
    Ok(Json(state.drafts().view(&ctx, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub rev: u32,
}

/// Bytes of one staged file at a given revision.
pub async fn preview(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path((id, index)): Path<(DraftId, usize)>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response> {
    let preview = state.drafts().preview(&ctx, id, index, query.rev).await?;
    Ok((
        [
            (header::CONTENT_TYPE, preview.content_type),
            (header::CACHE_CONTROL, "private, no-store".to_string()),
        ],
        preview.bytes,
    )
        .into_response())
}

pub async fn crop(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path((id, index)): Path<(DraftId, usize)>,
    Json(rect): Json<CropRect>,
) -> Result<Json<DraftView>> {
    Ok(Json(state.drafts().crop(&ctx, id, index, rect).await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitDraft {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Run the upload pipeline for a draft.
///
/// The draft is consumed once the title, description and file count pass;
/// a batch-level error leaves it in place for another try.
pub async fn submit_draft(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path(id): Path<DraftId>,
    Json(body): Json<SubmitDraft>,
) -> Result<Json<BatchReport>> {
    let (title, description) = (body.title.as_deref(), body.description.as_deref());
    let draft = state
        .drafts()
        .take(&ctx, id, |count| {
            check_submission(&ctx, title, description, count)
        })
        .await?;
    let report = UploadService::new(state.backend())
        .submit(&ctx, title, description, draft.entries)
        .await?;
    Ok(Json(report))
}

pub async fn dismiss_draft(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path(id): Path<DraftId>,
) -> Result<StatusCode> {
    state.drafts().dismiss(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
