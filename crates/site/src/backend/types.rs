//! Row and session types exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use classfete_core::{GalleryItemId, MediaStatus, ProfileId, Role, UserId};

/// A row in `gallery_images`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: GalleryItemId,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub status: MediaStatus,
    pub created_at: DateTime<Utc>,
}

impl GalleryItem {
    /// Whether the stored media is a video (by URL extension).
    #[must_use]
    pub fn is_video(&self) -> bool {
        classfete_core::is_video_url(&self.image_url)
    }
}

/// Insert payload for `gallery_images`.
#[derive(Debug, Clone, Serialize)]
pub struct NewGalleryItem {
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub status: MediaStatus,
}

/// A row in `hall_of_fame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub image_url: Option<String>,
    pub social_link_1: Option<String>,
    pub social_link_2: Option<String>,
    pub position: i32,
    #[serde(default)]
    pub locked: bool,
}

/// Insert payload for `hall_of_fame`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub position: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub social_link_1: Option<String>,
    #[serde(default)]
    pub social_link_2: Option<String>,
}

/// Editable profile fields. Every field is written; absent means cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub image_url: Option<String>,
    pub social_link_1: Option<String>,
    pub social_link_2: Option<String>,
}

/// A row in `user_roles`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role: Role,
}

/// An identity managed by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tokens returned by a successful sign-in, sign-up or refresh.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Outcome of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// The account is active and signed in.
    SignedIn(AuthSession),
    /// The account exists but must be confirmed by email first.
    ConfirmationRequired(AuthUser),
}

/// An object to put into storage.
#[derive(Debug, Clone)]
pub struct ObjectUpload {
    pub path: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Overwrite an existing object at `path`.
    pub upsert: bool,
}
