//! Hall-of-fame profiles.
//!
//! Edits overwrite the whole row; concurrent editors race and the last write
//! wins.

use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use classfete_core::{MediaKind, ProfileId, normalize_link};

use super::auth::AuthContext;
use super::require_admin;
use super::upload::StagedFile;
use crate::backend::{Backend, NewProfile, ObjectUpload, Profile, ProfileUpdate};
use crate::error::AppError;
use crate::media::profile_object_path;

/// Fields submitted from the edit form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileEdit {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub social_link_1: Option<String>,
    #[serde(default)]
    pub social_link_2: Option<String>,
}

impl ProfileEdit {
    fn normalize(self) -> Result<ProfileUpdate, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        Ok(ProfileUpdate {
            name: name.to_owned(),
            image_url: self
                .image_url
                .map(|u| u.trim().to_owned())
                .filter(|u| !u.is_empty()),
            social_link_1: self.social_link_1.as_deref().and_then(normalize_link),
            social_link_2: self.social_link_2.as_deref().and_then(normalize_link),
        })
    }
}

pub struct HallOfFameService<'a, B> {
    backend: &'a B,
}

impl<'a, B: Backend> HallOfFameService<'a, B> {
    #[must_use]
    pub const fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Profiles in ascending position.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Backend` if the query fails.
    pub async fn list(&self) -> Result<Vec<Profile>, AppError> {
        Ok(self.backend.list_profiles().await?)
    }

    /// Overwrite a profile's editable fields.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Forbidden` when the profile is locked
    /// and the viewer is not an admin, `BadRequest` for a blank name.
    #[instrument(skip(self, ctx, edit), fields(is_admin = ctx.is_admin))]
    pub async fn edit(&self, ctx: &AuthContext, id: ProfileId, edit: ProfileEdit) -> Result<Profile, AppError> {
        self.editable(ctx, id).await?;
        let update = edit.normalize()?;
        let profile = self.backend.update_profile(id, update).await?;
        tracing::info!(%id, "profile updated");
        Ok(profile)
    }

    /// Store a replacement image and return its public URL.
    ///
    /// The URL is persisted by a following [`Self::edit`].
    ///
    /// # Errors
    ///
    /// `Rejected` for a non-image or oversized file, plus the lock rule of
    /// [`Self::edit`].
    #[instrument(skip(self, ctx, file), fields(file_name = %file.file_name))]
    pub async fn upload_image(&self, ctx: &AuthContext, id: ProfileId, file: StagedFile) -> Result<String, AppError> {
        MediaKind::validate_profile_image(&file.content_type, file.size())?;
        self.editable(ctx, id).await?;

        let path = profile_object_path(id, &file.file_name, Utc::now().timestamp_millis());
        self.backend
            .upload_object(ObjectUpload {
                path: path.clone(),
                bytes: file.bytes,
                content_type: file.content_type,
                upsert: true,
            })
            .await?;
        Ok(self.backend.public_url(&path))
    }

    /// Flip the lock flag.
    ///
    /// # Errors
    ///
    /// Authorization errors for non-admins, `NotFound` for an unknown id.
    #[instrument(skip(self, ctx))]
    pub async fn toggle_lock(&self, ctx: &AuthContext, id: ProfileId) -> Result<Profile, AppError> {
        require_admin(ctx)?;
        let profile = self.find(id).await?;
        let profile = self.backend.set_profile_locked(id, !profile.locked).await?;
        tracing::info!(%id, locked = profile.locked, "profile lock toggled");
        Ok(profile)
    }

    /// Add a profile.
    ///
    /// # Errors
    ///
    /// Authorization errors for non-admins, `BadRequest` for a blank name.
    #[instrument(skip_all)]
    pub async fn create(&self, ctx: &AuthContext, profile: NewProfile) -> Result<Profile, AppError> {
        require_admin(ctx)?;
        let name = profile.name.trim().to_owned();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        let profile = self
            .backend
            .insert_profile(NewProfile {
                name,
                social_link_1: profile.social_link_1.as_deref().and_then(normalize_link),
                social_link_2: profile.social_link_2.as_deref().and_then(normalize_link),
                ..profile
            })
            .await?;
        tracing::info!(id = %profile.id, "profile created");
        Ok(profile)
    }

    async fn find(&self, id: ProfileId) -> Result<Profile, AppError> {
        self.backend
            .get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
    }

    async fn editable(&self, ctx: &AuthContext, id: ProfileId) -> Result<Profile, AppError> {
        let profile = self.find(id).await?;
        if profile.locked && !ctx.is_admin {
            return Err(AppError::Forbidden("This profile is locked".to_string()));
        }
        Ok(profile)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::services::test_support::{anonymous, backend, ctx};

    async fn profile(backend: &MemoryBackend, position: i32) -> Profile {
        backend
            .insert_profile(NewProfile {
                name: format!("Student {position}"),
                position,
                image_url: None,
                social_link_1: None,
                social_link_2: None,
            })
            .await
            .unwrap()
    }

    fn edit(name: &str, link: &str) -> ProfileEdit {
        ProfileEdit {
            name: name.to_string(),
            image_url: Some("  ".to_string()),
            social_link_1: Some(link.to_string()),
            social_link_2: Some(String::new()),
        }
    }

    #[tokio::test]
    async fn test_list_ordered_by_position() {
        let backend = backend();
        profile(&backend, 2).await;
        profile(&backend, 1).await;
        let list = HallOfFameService::new(&backend).list().await.unwrap();
        let positions: Vec<i32> = list.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_edit_normalizes_links() {
        let backend = backend();
        let p = profile(&backend, 1).await;
        let service = HallOfFameService::new(&backend);

        let updated = service
            .edit(&anonymous(), p.id, edit(" Lan ", "example.com"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Lan");
        assert_eq!(updated.social_link_1.as_deref(), Some("https://example.com"));
        assert_eq!(updated.social_link_2, None);
        assert_eq!(updated.image_url, None);
    }

    #[tokio::test]
    async fn test_locked_profile_blocks_non_admin() {
        let backend = backend();
        let p = profile(&backend, 1).await;
        let service = HallOfFameService::new(&backend);
        let admin = ctx(true);

        let locked = service.toggle_lock(&admin, p.id).await.unwrap();
        assert!(locked.locked);

        let err = service
            .edit(&ctx(false), p.id, edit("Changed", "x.com"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(backend.get_profile(p.id).await.unwrap().unwrap().name, p.name);

        let by_admin = service
            .edit(&admin, p.id, edit("Admin edit", "https://x.com"))
            .await
            .unwrap();
        assert_eq!(by_admin.social_link_1.as_deref(), Some("https://x.com"));

        let unlocked = service.toggle_lock(&admin, p.id).await.unwrap();
        assert!(!unlocked.locked);
        service
            .edit(&ctx(false), p.id, edit("Student", ""))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_toggle_lock_requires_admin() {
        let backend = backend();
        let p = profile(&backend, 1).await;
        let err = HallOfFameService::new(&backend)
            .toggle_lock(&ctx(false), p.id)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_upload_image() {
        let backend = backend();
        let p = profile(&backend, 1).await;
        let service = HallOfFameService::new(&backend);
        let file = StagedFile {
            file_name: "me.PNG".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };

        let url = service.upload_image(&anonymous(), p.id, file.clone()).await.unwrap();
        let prefix = format!("http://localhost:3000/media/gallery-images/{}-", p.id);
        assert!(url.starts_with(&prefix));
        assert!(url.ends_with(".png"));

        let video = StagedFile {
            content_type: "video/mp4".to_string(),
            ..file
        };
        let err = service.upload_image(&anonymous(), p.id, video).await.unwrap_err();
        assert!(matches!(err, AppError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_create_requires_admin_and_name() {
        let backend = backend();
        let service = HallOfFameService::new(&backend);
        let new = NewProfile {
            name: "  ".to_string(),
            position: 1,
            image_url: None,
            social_link_1: Some("fb.com/x".to_string()),
            social_link_2: None,
        };

        let err = service.create(&anonymous(), new.clone()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        let err = service.create(&ctx(true), new.clone()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let created = service
            .create(
                &ctx(true),
                NewProfile {
                    name: "Mai".to_string(),
                    ..new
                },
            )
            .await
            .unwrap();
        assert_eq!(created.social_link_1.as_deref(), Some("https://fb.com/x"));
    }

    #[tokio::test]
    async fn test_unknown_profile() {
        let backend = backend();
        let err = HallOfFameService::new(&backend)
            .edit(&ctx(true), ProfileId::random(), edit("x", ""))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
