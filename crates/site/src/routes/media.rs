//! Object serving for the in-memory backend.
//!
//! The hosted backend serves its own public URLs; with the memory backend the
//! site answers `/media/{bucket}/{path}` itself.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::state::AppState;

pub async fn object(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound("Object not found".to_string());
    let memory = state.backend().as_memory().ok_or_else(not_found)?;
    if bucket != memory.bucket() {
        return Err(not_found());
    }
    let object = memory.object(&path).ok_or_else(not_found)?;
    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        object.bytes,
    )
        .into_response())
}
