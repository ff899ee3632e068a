//! Moderation queue and admin gallery actions.

use tracing::instrument;

use classfete_core::{GalleryItemId, MediaStatus, ModerationDecision};

use super::auth::AuthContext;
use super::require_admin;
use crate::backend::{Backend, GalleryItem};
use crate::error::AppError;
use crate::inflight::InFlight;

pub struct ModerationService<'a, B> {
    backend: &'a B,
    in_flight: &'a InFlight<GalleryItemId>,
}

impl<'a, B: Backend> ModerationService<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B, in_flight: &'a InFlight<GalleryItemId>) -> Self {
        Self { backend, in_flight }
    }

    /// Every pending row, newest first.
    ///
    /// # Errors
    ///
    /// Returns an authorization error for non-admins, or `AppError::Backend`.
    #[instrument(skip(self, ctx))]
    pub async fn list_pending(&self, ctx: &AuthContext) -> Result<Vec<GalleryItem>, AppError> {
        require_admin(ctx)?;
        Ok(self.backend.list_gallery(&[MediaStatus::Pending]).await?)
    }

    /// Approve a row.
    ///
    /// # Errors
    ///
    /// See [`Self::decide`].
    pub async fn approve(&self, ctx: &AuthContext, id: GalleryItemId) -> Result<GalleryItem, AppError> {
        self.decide(ctx, id, ModerationDecision::Approve).await
    }

    /// Reject a row.
    ///
    /// # Errors
    ///
    /// See [`Self::decide`].
    pub async fn reject(&self, ctx: &AuthContext, id: GalleryItemId) -> Result<GalleryItem, AppError> {
        self.decide(ctx, id, ModerationDecision::Reject).await
    }

    /// Apply a moderation decision with a single row update.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`/`Forbidden` unless the caller is an admin
    /// - `Conflict` while another action on the same row is running
    /// - `Backend(NotFound)` for an unknown id
    #[instrument(skip(self, ctx), fields(admin_id = ?ctx.user_id()))]
    pub async fn decide(
        &self,
        ctx: &AuthContext,
        id: GalleryItemId,
        decision: ModerationDecision,
    ) -> Result<GalleryItem, AppError> {
        require_admin(ctx)?;
        let _guard = self
            .in_flight
            .try_acquire(id)
            .ok_or_else(|| AppError::Conflict("This item is already being updated".to_string()))?;

        let item = self
            .backend
            .update_gallery_status(id, decision.target_status())
            .await?;
        tracing::info!(%id, status = %item.status, "gallery item moderated");
        Ok(item)
    }

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Same classes as [`Self::decide`].
    #[instrument(skip(self, ctx), fields(admin_id = ?ctx.user_id()))]
    pub async fn delete(&self, ctx: &AuthContext, id: GalleryItemId) -> Result<(), AppError> {
        require_admin(ctx)?;
        let _guard = self
            .in_flight
            .try_acquire(id)
            .ok_or_else(|| AppError::Conflict("This item is already being updated".to_string()))?;

        self.backend.delete_gallery_item(id).await?;
        tracing::info!(%id, "gallery item deleted");
        Ok(())
    }
}
