//! Gallery upload pipeline.
//!
//! Every file in a batch is validated on its own. Valid files are uploaded to
//! storage under a fresh path, then inserted as a gallery row; a failure in
//! either step is reported for that file only and never aborts its siblings.
//!
//! Status is decided when the batch is submitted: `approved` for admins,
//! `pending` for everyone else.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::instrument;

use classfete_core::{
    MediaKind, MediaRejection, MediaStatus, normalize_description, normalize_title,
};

use super::auth::AuthContext;
use crate::backend::{Backend, GalleryItem, NewGalleryItem, ObjectUpload};
use crate::error::AppError;
use crate::media::gallery_object_path;

/// Files a non-admin may submit in one batch.
pub const NON_ADMIN_FILE_LIMIT: usize = 1;

/// A file received from the browser.
#[derive(Clone)]
pub struct StagedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedFile {
    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// A file after validation. Rejected files keep only their name.
#[derive(Debug, Clone)]
pub enum BatchEntry {
    Staged(StagedFile),
    Rejected {
        file_name: String,
        reason: MediaRejection,
    },
}

impl BatchEntry {
    /// Validate `file` for the gallery.
    #[must_use]
    pub fn validate(file: StagedFile) -> Self {
        match MediaKind::validate_upload(&file.content_type, file.size()) {
            Ok(_) => Self::Staged(file),
            Err(reason) => Self::Rejected {
                file_name: file.file_name,
                reason,
            },
        }
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Staged(file) => &file.file_name,
            Self::Rejected { file_name, .. } => file_name,
        }
    }
}

/// Step of the pipeline that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    Storage,
    Insert,
}

/// What happened to one file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Uploaded {
        file_name: String,
        item: GalleryItem,
    },
    Rejected {
        file_name: String,
        message: String,
        reason: MediaRejection,
    },
    Failed {
        file_name: String,
        step: UploadStep,
        message: String,
    },
}

impl FileOutcome {
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Uploaded { file_name, .. }
            | Self::Rejected { file_name, .. }
            | Self::Failed { file_name, .. } => file_name,
        }
    }

    fn rejected(file_name: String, reason: MediaRejection) -> Self {
        Self::Rejected {
            file_name,
            message: reason.to_string(),
            reason,
        }
    }
}

/// Per-file report for a submitted batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub status: MediaStatus,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn uploaded(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Uploaded { .. }))
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Rejected { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }

    /// One-line summary for a toast.
    #[must_use]
    pub fn summary(&self) -> String {
        let uploaded = self.uploaded();
        let text = match (uploaded, self.status) {
            (0, _) => "No files were uploaded".to_string(),
            (n, MediaStatus::Approved) => format!("{n} file(s) uploaded"),
            (n, _) => format!("{n} file(s) uploaded and awaiting approval"),
        };
        let problems = self.rejected() + self.failed();
        if problems > 0 {
            format!("{text}, {problems} failed")
        } else {
            text
        }
    }
}

/// Check the file count against the viewer's role.
///
/// # Errors
///
/// `BadRequest` for an empty batch, or more than [`NON_ADMIN_FILE_LIMIT`]
/// files from a non-admin.
pub fn check_batch_size(count: usize, is_admin: bool) -> Result<(), AppError> {
    if count == 0 {
        return Err(AppError::BadRequest("Select at least one file".to_string()));
    }
    if !is_admin && count > NON_ADMIN_FILE_LIMIT {
        return Err(AppError::BadRequest(
            "Only one file can be uploaded at a time".to_string(),
        ));
    }
    Ok(())
}

/// Batch-level checks of [`UploadService::submit`], without touching files.
///
/// # Errors
///
/// `BadRequest` for a title or description that is too long, or a file count
/// the viewer's role does not allow.
pub fn check_submission(
    ctx: &AuthContext,
    title: Option<&str>,
    description: Option<&str>,
    count: usize,
) -> Result<(), AppError> {
    normalize_title(title)?;
    normalize_description(description)?;
    check_batch_size(count, ctx.is_admin)
}

pub struct UploadService<'a, B> {
    backend: &'a B,
}

impl<'a, B: Backend> UploadService<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Validate and upload `files` in one step.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn upload(
        &self,
        ctx: &AuthContext,
        title: Option<&str>,
        description: Option<&str>,
        files: Vec<StagedFile>,
    ) -> Result<BatchReport, AppError> {
        let entries = files.into_iter().map(BatchEntry::validate).collect();
        self.submit(ctx, title, description, entries).await
    }

    /// Upload every staged entry concurrently and report per file.
    ///
    /// # Errors
    ///
    /// Only batch-level problems abort: a title or description that is too
    /// long, or a file count the viewer's role does not allow. Per-file
    /// problems are reported in the [`BatchReport`].
    #[instrument(skip_all, fields(files = entries.len(), is_admin = ctx.is_admin))]
    pub async fn submit(
        &self,
        ctx: &AuthContext,
        title: Option<&str>,
        description: Option<&str>,
        entries: Vec<BatchEntry>,
    ) -> Result<BatchReport, AppError> {
        let title = normalize_title(title)?;
        let description = normalize_description(description)?;
        check_batch_size(entries.len(), ctx.is_admin)?;

        let status = MediaStatus::for_upload(ctx.is_admin);
        let outcomes = join_all(entries.into_iter().map(|entry| {
            self.upload_one(entry, &title, description.as_deref(), status)
        }))
        .await;

        let report = BatchReport { status, outcomes };
        tracing::info!(
            uploaded = report.uploaded(),
            rejected = report.rejected(),
            failed = report.failed(),
            %status,
            "upload batch finished"
        );
        Ok(report)
    }

    async fn upload_one(
        &self,
        entry: BatchEntry,
        title: &str,
        description: Option<&str>,
        status: MediaStatus,
    ) -> FileOutcome {
        let file = match entry {
            BatchEntry::Staged(file) => file,
            BatchEntry::Rejected { file_name, reason } => {
                return FileOutcome::rejected(file_name, reason);
            }
        };
        // Content may have changed since staging (crop), so check again.
        if let Err(reason) = MediaKind::validate_upload(&file.content_type, file.size()) {
            return FileOutcome::rejected(file.file_name, reason);
        }

        let path = gallery_object_path(
            &file.file_name,
            Utc::now().timestamp_millis(),
            &mut rand::rng(),
        );
        let StagedFile {
            file_name,
            content_type,
            bytes,
        } = file;

        if let Err(e) = self
            .backend
            .upload_object(ObjectUpload {
                path: path.clone(),
                bytes,
                content_type,
                upsert: false,
            })
            .await
        {
            tracing::warn!(%file_name, %path, error = %e, "storage upload failed");
            return FileOutcome::Failed {
                file_name,
                step: UploadStep::Storage,
                message: format!("Upload failed: {e}"),
            };
        }

        let image_url = self.backend.public_url(&path);
        match self
            .backend
            .insert_gallery_item(NewGalleryItem {
                title: title.to_owned(),
                description: description.map(str::to_owned),
                image_url,
                status,
            })
            .await
        {
            Ok(item) => {
                tracing::debug!(%file_name, id = %item.id, "gallery item created");
                FileOutcome::Uploaded { file_name, item }
            }
            Err(e) => {
                tracing::warn!(%file_name, %path, error = %e, "gallery insert failed");
                FileOutcome::Failed {
                    file_name,
                    step: UploadStep::Insert,
                    message: format!("Saving failed: {e}"),
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::StatusCode;
    use classfete_core::MAX_UPLOAD_BYTES;

    use super::*;
    use crate::services::test_support::{anonymous, backend, ctx};

    fn file(name: &str, content_type: &str, len: usize) -> StagedFile {
        StagedFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0; len],
        }
    }

    #[tokio::test]
    async fn test_admin_batch_with_oversized_file() {
        let backend = backend();
        let service = UploadService::new(&backend);
        let oversized = usize::try_from(MAX_UPLOAD_BYTES).unwrap() + 1;

        let report = service
            .upload(
                &ctx(true),
                Some("Prom"),
                None,
                vec![
                    file("a.png", "image/png", 10),
                    file("b.mp4", "video/mp4", 10),
                    file("c.png", "image/png", oversized),
                ],
            )
            .await
            .unwrap();

        assert_eq!(report.uploaded(), 2);
        assert_eq!(report.rejected(), 1);
        assert_eq!(report.outcomes[2].file_name(), "c.png");

        let rows = backend.list_gallery(MediaStatus::ADMIN).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.status == MediaStatus::Approved));
        assert!(rows.iter().all(|r| r.title == "Prom"));
        assert_eq!(backend.object_paths().len(), 2);
    }

    #[tokio::test]
    async fn test_non_admin_upload_is_pending() {
        let backend = backend();
        let service = UploadService::new(&backend);

        let report = service
            .upload(&anonymous(), None, None, vec![file("a.png", "image/png", 4)])
            .await
            .unwrap();
        assert_eq!(report.status, MediaStatus::Pending);
        let FileOutcome::Uploaded { item, .. } = &report.outcomes[0] else {
            panic!("expected upload");
        };
        assert_eq!(item.status, MediaStatus::Pending);
        assert_eq!(item.title, "none");
        assert!(item.description.is_none());
    }

    #[tokio::test]
    async fn test_non_admin_limited_to_one_file() {
        let backend = backend();
        let service = UploadService::new(&backend);

        let err = service
            .upload(
                &ctx(false),
                None,
                None,
                vec![file("a.png", "image/png", 1), file("b.png", "image/png", 1)],
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(backend.object_paths().is_empty());
    }

    #[tokio::test]
    async fn test_long_title_aborts_batch() {
        let backend = backend();
        let service = UploadService::new(&backend);
        let title = "x".repeat(101);

        let err = service
            .upload(&ctx(true), Some(&title), None, vec![file("a.png", "image/png", 1)])
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(backend.object_paths().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected() {
        let backend = backend();
        let service = UploadService::new(&backend);

        let report = service
            .upload(&ctx(true), None, None, vec![file("a.pdf", "application/pdf", 1)])
            .await
            .unwrap();
        assert_eq!(report.rejected(), 1);
        assert!(backend.list_gallery(MediaStatus::ADMIN).await.unwrap().is_empty());
        assert_eq!(report.summary(), "No files were uploaded, 1 failed");
    }

    #[tokio::test]
    async fn test_storage_failure_isolated() {
        let backend = backend();
        backend.fail_uploads_where(|upload| upload.path.ends_with(".mp4"));
        let service = UploadService::new(&backend);

        let report = service
            .upload(
                &ctx(true),
                None,
                None,
                vec![file("a.png", "image/png", 1), file("b.mp4", "video/mp4", 1)],
            )
            .await
            .unwrap();

        assert_eq!(report.uploaded(), 1);
        assert!(matches!(
            report.outcomes[1],
            FileOutcome::Failed {
                step: UploadStep::Storage,
                ..
            }
        ));
        assert_eq!(backend.list_gallery(MediaStatus::ADMIN).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_paths_are_unique_and_public() {
        let backend = backend();
        let service = UploadService::new(&backend);
        let files = (0..5).map(|i| file(&format!("{i}.JPG"), "image/jpeg", 1)).collect();

        let report = service.upload(&ctx(true), None, None, files).await.unwrap();
        assert_eq!(report.uploaded(), 5);

        let mut paths = backend.object_paths();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 5);
        assert!(paths.iter().all(|p| p.ends_with(".JPG")));

        for outcome in &report.outcomes {
            let FileOutcome::Uploaded { item, .. } = outcome else {
                panic!("expected upload");
            };
            assert!(item.image_url.starts_with("http://localhost:3000/media/gallery-images/"));
        }
    }

    #[test]
    fn test_summary_wording() {
        let report = BatchReport {
            status: MediaStatus::Pending,
            outcomes: Vec::new(),
        };
        assert_eq!(report.summary(), "No files were uploaded");
    }
}
