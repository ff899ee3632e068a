//! Server-side staging of an upload batch.
//!
//! A draft holds the selected files between selection and submit so the
//! browser can preview and crop them. Drafts are kept in a `moka` cache and
//! expire when idle. Every change to a file's bytes bumps its revision; a
//! preview URL for an older revision returns 404, so a stale preview can
//! never be shown for replaced content.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::instrument;

use classfete_core::{DraftId, MediaKind, UserId};

use super::auth::AuthContext;
use super::upload::{BatchEntry, StagedFile, check_batch_size};
use crate::error::AppError;
use crate::media::{CropError, CropRect, crop_to_jpeg_blocking};

/// Idle time after which a draft is discarded.
pub const DRAFT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Total staged bytes kept across all drafts; the least used drafts are
/// evicted beyond this.
pub const MAX_DRAFT_BYTES: u64 = 2 * 1024 * 1024 * 1024;

#[derive(Debug)]
struct DraftFile {
    entry: BatchEntry,
    revision: u32,
}

#[derive(Debug)]
struct Draft {
    owner: Option<UserId>,
    files: Vec<DraftFile>,
}

/// Cache entry: the draft plus its weight, fixed at staging time.
struct DraftSlot {
    bytes: u32,
    draft: Mutex<Draft>,
}

/// Browser view of one staged file.
#[derive(Debug, Clone, Serialize)]
pub struct DraftFileView {
    pub index: usize,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub kind: Option<MediaKind>,
    pub revision: u32,
    pub preview_url: Option<String>,
    pub rejection: Option<String>,
}

/// Browser view of a draft.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    pub id: DraftId,
    pub files: Vec<DraftFileView>,
}

/// Bytes of a staged file for preview.
#[derive(Debug, Clone)]
pub struct Preview {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Entries taken out of a submitted draft.
#[derive(Debug)]
pub struct SubmittedDraft {
    pub entries: Vec<BatchEntry>,
}

/// All drafts in flight.
#[derive(Clone)]
pub struct DraftStore {
    cache: Cache<DraftId, Arc<DraftSlot>>,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::new(DRAFT_IDLE_TIMEOUT)
    }
}

impl DraftStore {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self::with_capacity(idle_timeout, MAX_DRAFT_BYTES)
    }

    /// Store holding at most `max_bytes` of staged files.
    #[must_use]
    pub fn with_capacity(idle_timeout: Duration, max_bytes: u64) -> Self {
        let cache = Cache::builder()
            .weigher(|_id: &DraftId, slot: &Arc<DraftSlot>| slot.bytes)
            .max_capacity(max_bytes)
            .time_to_idle(idle_timeout)
            .build();
        Self { cache }
    }

    /// Stage `files`, validating each one.
    ///
    /// # Errors
    ///
    /// `BadRequest` when the file count is not allowed for the viewer.
    #[instrument(skip_all, fields(files = files.len(), is_admin = ctx.is_admin))]
    pub async fn create(&self, ctx: &AuthContext, files: Vec<StagedFile>) -> Result<DraftView, AppError> {
        check_batch_size(files.len(), ctx.is_admin)?;

        let id = DraftId::random();
        let draft = Draft {
            owner: ctx.user_id(),
            files: files
                .into_iter()
                .map(|file| DraftFile {
                    entry: BatchEntry::validate(file),
                    revision: 0,
                })
                .collect(),
        };
        let view = draft.view(id);
        let bytes = u32::try_from(draft.staged_bytes()).unwrap_or(u32::MAX);
        self.cache
            .insert(
                id,
                Arc::new(DraftSlot {
                    bytes,
                    draft: Mutex::new(draft),
                }),
            )
            .await;
        tracing::debug!(%id, bytes, "draft created");
        Ok(view)
    }

    /// Current view of a draft.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown, expired or foreign draft.
    pub async fn view(&self, ctx: &AuthContext, id: DraftId) -> Result<DraftView, AppError> {
        let slot = self.get(ctx, id).await?;
        let draft = slot.draft.lock().await;
        Ok(draft.view(id))
    }

    /// Bytes of file `index` at `revision`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the draft, the file or that revision no longer exists.
    pub async fn preview(
        &self,
        ctx: &AuthContext,
        id: DraftId,
        index: usize,
        revision: u32,
    ) -> Result<Preview, AppError> {
        let slot = self.get(ctx, id).await?;
        let draft = slot.draft.lock().await;
        match draft.files.get(index) {
            Some(DraftFile {
                entry: BatchEntry::Staged(file),
                revision: current,
            }) if *current == revision => Ok(Preview {
                content_type: file.content_type.clone(),
                bytes: file.bytes.clone(),
            }),
            _ => Err(AppError::NotFound("Preview not found".to_string())),
        }
    }

    /// Replace image `index` with its square crop, encoded as JPEG.
    ///
    /// The file keeps its name; its content type becomes `image/jpeg`.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing draft or file, `Crop` for a non-image or an
    /// invalid rectangle.
    #[instrument(skip(self, ctx))]
    pub async fn crop(
        &self,
        ctx: &AuthContext,
        id: DraftId,
        index: usize,
        rect: CropRect,
    ) -> Result<DraftView, AppError> {
        let slot = self.get(ctx, id).await?;
        let mut draft = slot.draft.lock().await;
        let staged = draft
            .files
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;
        let BatchEntry::Staged(file) = &mut staged.entry else {
            return Err(CropError::NotAnImage.into());
        };
        if MediaKind::from_content_type(&file.content_type) != Some(MediaKind::Image) {
            return Err(CropError::NotAnImage.into());
        }

        let cropped = crop_to_jpeg_blocking(file.bytes.clone(), rect).await?;
        file.bytes = cropped;
        file.content_type = "image/jpeg".to_string();
        staged.revision += 1;
        tracing::debug!(%id, index, revision = staged.revision, "draft file cropped");
        Ok(draft.view(id))
    }

    /// Remove the draft and hand its entries to the caller.
    ///
    /// `check` sees the number of staged files first. When it fails the draft
    /// stays as it is, so the user can correct the form and submit again.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown, expired or foreign draft, or the error
    /// returned by `check`.
    pub async fn take(
        &self,
        ctx: &AuthContext,
        id: DraftId,
        check: impl FnOnce(usize) -> Result<(), AppError> + Send,
    ) -> Result<SubmittedDraft, AppError> {
        let slot = self.get(ctx, id).await?;
        let mut draft = slot.draft.lock().await;
        check(draft.files.len())?;

        self.cache.invalidate(&id).await;
        let entries = std::mem::take(&mut draft.files)
            .into_iter()
            .map(|f| f.entry)
            .collect();
        Ok(SubmittedDraft { entries })
    }

    /// Discard a draft.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown, expired or foreign draft.
    pub async fn dismiss(&self, ctx: &AuthContext, id: DraftId) -> Result<(), AppError> {
        self.get(ctx, id).await?;
        self.cache.invalidate(&id).await;
        tracing::debug!(%id, "draft dismissed");
        Ok(())
    }

    async fn get(&self, ctx: &AuthContext, id: DraftId) -> Result<Arc<DraftSlot>, AppError> {
        let not_found = || AppError::NotFound("Draft not found or expired".to_string());
        let slot = self.cache.get(&id).await.ok_or_else(not_found)?;
        if slot.draft.lock().await.owner != ctx.user_id() {
            return Err(not_found());
        }
        Ok(slot)
    }
}

impl Draft {
    fn staged_bytes(&self) -> u64 {
        self.files
            .iter()
            .map(|f| match &f.entry {
                BatchEntry::Staged(file) => file.size(),
                BatchEntry::Rejected { .. } => 0,
            })
            .sum()
    }

    fn view(&self, id: DraftId) -> DraftView {
        let files = self
            .files
            .iter()
            .enumerate()
            .map(|(index, f)| match &f.entry {
                BatchEntry::Staged(file) => DraftFileView {
                    index,
                    file_name: file.file_name.clone(),
                    content_type: Some(file.content_type.clone()),
                    size: Some(file.size()),
                    kind: MediaKind::from_content_type(&file.content_type),
                    revision: f.revision,
                    preview_url: Some(format!(
                        "/api/uploads/drafts/{id}/files/{index}/preview?rev={}",
                        f.revision
                    )),
                    rejection: None,
                },
                BatchEntry::Rejected { file_name, reason } => DraftFileView {
                    index,
                    file_name: file_name.clone(),
                    content_type: None,
                    size: None,
                    kind: None,
                    revision: f.revision,
                    preview_url: None,
                    rejection: Some(reason.to_string()),
                },
            })
            .collect();
        DraftView { id, files }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::media::crop::tests::png;
    use crate::services::upload::check_submission;
    use crate::services::test_support::{anonymous, ctx};

    fn image(name: &str) -> StagedFile {
        StagedFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: png(40, 30),
        }
    }

    #[tokio::test]
    async fn test_create_validates_each_file() {
        let store = DraftStore::default();
        let pdf = StagedFile {
            file_name: "x.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![1],
        };
        let view = store.create(&ctx(true), vec![image("a.png"), pdf]).await.unwrap();

        assert!(view.files[0].preview_url.is_some());
        assert_eq!(view.files[0].kind, Some(MediaKind::Image));
        assert!(view.files[1].preview_url.is_none());
        assert!(view.files[1].rejection.is_some());
    }

    #[tokio::test]
    async fn test_non_admin_single_file() {
        let store = DraftStore::default();
        let err = store
            .create(&anonymous(), vec![image("a.png"), image("b.png")])
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_crop_bumps_revision_and_retires_old_preview() {
        let store = DraftStore::default();
        let viewer = anonymous();
        let view = store.create(&viewer, vec![image("a.png")]).await.unwrap();
        let id = view.id;

        let rect = CropRect {
            x: 5,
            y: 0,
            width: 30,
            height: 30,
        };
        let view = store.crop(&viewer, id, 0, rect).await.unwrap();
        assert_eq!(view.files[0].revision, 1);
        assert_eq!(view.files[0].file_name, "a.png");
        assert_eq!(view.files[0].content_type.as_deref(), Some("image/jpeg"));

        let stale = store.preview(&viewer, id, 0, 0).await.unwrap_err();
        assert_eq!(stale.status(), StatusCode::NOT_FOUND);

        let fresh = store.preview(&viewer, id, 0, 1).await.unwrap();
        let decoded = image::load_from_memory(&fresh.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (30, 30));
    }

    #[tokio::test]
    async fn test_crop_refuses_video_and_bad_rect() {
        let store = DraftStore::default();
        let admin = ctx(true);
        let video = StagedFile {
            file_name: "v.mp4".to_string(),
            content_type: "video/mp4".to_string(),
            bytes: vec![0; 8],
        };
        let view = store.create(&admin, vec![video, image("a.png")]).await.unwrap();
        let square = CropRect {
            x: 0,
            y: 0,
            width: 10,
            height: 10,
        };

        let err = store.crop(&admin, view.id, 0, square).await.unwrap_err();
        assert!(matches!(err, AppError::Crop(CropError::NotAnImage)));

        let too_wide = CropRect {
            x: 0,
            y: 0,
            width: 20,
            height: 10,
        };
        let err = store.crop(&admin, view.id, 1, too_wide).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let unchanged = store.view(&admin, view.id).await.unwrap();
        assert_eq!(unchanged.files[1].revision, 0);
    }

    #[tokio::test]
    async fn test_take_consumes_draft() {
        let store = DraftStore::default();
        let admin = ctx(true);
        let view = store.create(&admin, vec![image("a.png")]).await.unwrap();

        let submitted = store.take(&admin, view.id, |_| Ok(())).await.unwrap();
        assert_eq!(submitted.entries.len(), 1);
        assert!(store.take(&admin, view.id, |_| Ok(())).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_submit_check_keeps_draft() {
        let store = DraftStore::default();
        let viewer = ctx(false);
        let view = store.create(&viewer, vec![image("a.png")]).await.unwrap();
        let rect = CropRect {
            x: 0,
            y: 0,
            width: 30,
            height: 30,
        };
        store.crop(&viewer, view.id, 0, rect).await.unwrap();

        let long_title = "x".repeat(101);
        let err = store
            .take(&viewer, view.id, |count| {
                check_submission(&viewer, Some(&long_title), None, count)
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let kept = store.view(&viewer, view.id).await.unwrap();
        assert_eq!(kept.files[0].revision, 1);
        assert!(store.preview(&viewer, view.id, 0, 1).await.is_ok());

        let submitted = store
            .take(&viewer, view.id, |count| {
                check_submission(&viewer, Some("Prom"), None, count)
            })
            .await
            .unwrap();
        let BatchEntry::Staged(file) = &submitted.entries[0] else {
            panic!("expected staged file");
        };
        assert_eq!(file.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_dismiss_releases_previews() {
        let store = DraftStore::default();
        let viewer = ctx(false);
        let view = store.create(&viewer, vec![image("a.png")]).await.unwrap();
        assert!(store.preview(&viewer, view.id, 0, 0).await.is_ok());

        store.dismiss(&viewer, view.id).await.unwrap();

        let preview = store.preview(&viewer, view.id, 0, 0).await.unwrap_err();
        assert_eq!(preview.status(), StatusCode::NOT_FOUND);
        let draft = store.view(&viewer, view.id).await.unwrap_err();
        assert_eq!(draft.status(), StatusCode::NOT_FOUND);
        assert!(store.dismiss(&viewer, view.id).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_drafts_expire() {
        let store = DraftStore::new(Duration::from_millis(50));
        let viewer = anonymous();
        let view = store.create(&viewer, vec![image("a.png")]).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        let err = store.preview(&viewer, view.id, 0, 0).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_capacity_is_weighed_in_bytes() {
        let store = DraftStore::default();
        let files = vec![image("a.png"), image("b.png")];
        let expected: u64 = files.iter().map(StagedFile::size).sum();

        store.create(&ctx(true), files).await.unwrap();
        store.cache.run_pending_tasks().await;

        assert_eq!(store.cache.weighted_size(), expected);
    }

    #[tokio::test]
    async fn test_drafts_are_private() {
        let store = DraftStore::default();
        let view = store.create(&ctx(false), vec![image("a.png")]).await.unwrap();

        let other = ctx(false);
        assert_eq!(
            store.view(&other, view.id).await.unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
        assert!(store.dismiss(&anonymous(), view.id).await.is_err());
    }
}
