//! Gallery listing.

use tracing::instrument;

use classfete_core::MediaStatus;

use super::auth::AuthContext;
use crate::backend::{Backend, GalleryItem};
use crate::error::AppError;

pub struct GalleryService<'a, B> {
    backend: &'a B,
}

impl<'a, B: Backend> GalleryService<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Rows the viewer may see, newest first.
    ///
    /// Non-admins see `approved` rows only; admins also see `pending`.
    /// `rejected` rows are never listed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Backend` if the query fails.
    #[instrument(skip(self, ctx), fields(is_admin = ctx.is_admin))]
    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<GalleryItem>, AppError> {
        let statuses = MediaStatus::visible_to(ctx.is_admin);
        Ok(self.backend.list_gallery(statuses).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::NewGalleryItem;
    use crate::services::test_support::{anonymous, backend, ctx};

    #[tokio::test]
    async fn test_visibility_by_role() {
        let backend = backend();
        for status in [MediaStatus::Approved, MediaStatus::Pending, MediaStatus::Rejected] {
            backend
                .insert_gallery_item(NewGalleryItem {
                    title: status.to_string(),
                    description: None,
                    image_url: format!("u/{status}.jpg"),
                    status,
                })
                .await
                .unwrap();
        }
        let service = GalleryService::new(&backend);

        for viewer in [anonymous(), ctx(false)] {
            let items = service.list(&viewer).await.unwrap();
            assert!(items.iter().all(|i| i.status == MediaStatus::Approved));
            assert_eq!(items.len(), 1);
        }

        let admin_items = service.list(&ctx(true)).await.unwrap();
        assert_eq!(admin_items.len(), 2);
        assert!(admin_items.iter().all(|i| i.status != MediaStatus::Rejected));
    }
}
