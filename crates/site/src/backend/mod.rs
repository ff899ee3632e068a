//! Backend-as-a-service boundary.
//!
//! Persistence, authentication, object storage and change notification all
//! live behind the [`Backend`] trait. Two implementations exist:
//!
//! - [`HostedBackend`]: REST client for a Supabase-compatible service
//! - [`MemoryBackend`]: complete in-process implementation for local
//!   development and tests
//!
//! [`BackendClient`] is the runtime choice between them and is what
//! [`AppState`](crate::state::AppState) holds.

mod hosted;
mod memory;
mod types;

pub use hosted::HostedBackend;
pub use memory::{MemoryBackend, StoredObject};
pub use types::*;

use std::future::Future;

use thiserror::Error;

use classfete_core::{Email, GalleryItemId, MediaStatus, ProfileId, Role, Table, UserId};

use crate::realtime::Subscription;

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Credentials or token rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Row or object not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated (duplicate row or existing object).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Operations the application needs from its backend.
///
/// Mutations publish a [`ChangeEvent`](classfete_core::ChangeEvent) to the
/// backend's change feed after they succeed.
pub trait Backend: Clone + Send + Sync + 'static {
    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange email and password for a session.
    fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    /// Create an account.
    fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<SignUpOutcome, BackendError>> + Send;

    /// Revoke the session that owns `access_token`.
    fn sign_out(&self, access_token: &str)
    -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Exchange a refresh token for a new session.
    fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<AuthSession, BackendError>> + Send;

    /// Every identity known to the auth service (admin API).
    fn list_auth_users(&self) -> impl Future<Output = Result<Vec<AuthUser>, BackendError>> + Send;

    // =========================================================================
    // Roles
    // =========================================================================

    /// Whether `user_id` holds `role`.
    fn has_role(
        &self,
        user_id: UserId,
        role: Role,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Every user id holding `role`.
    fn list_role_holders(
        &self,
        role: Role,
    ) -> impl Future<Output = Result<Vec<UserId>, BackendError>> + Send;

    /// Insert a role row. A duplicate is [`BackendError::Conflict`].
    fn insert_role(
        &self,
        user_id: UserId,
        role: Role,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Delete a role row. Deleting a missing row is not an error.
    fn delete_role(
        &self,
        user_id: UserId,
        role: Role,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    // =========================================================================
    // Gallery
    // =========================================================================

    /// Gallery rows with one of `statuses`, newest first.
    fn list_gallery(
        &self,
        statuses: &[MediaStatus],
    ) -> impl Future<Output = Result<Vec<GalleryItem>, BackendError>> + Send;

    fn get_gallery_item(
        &self,
        id: GalleryItemId,
    ) -> impl Future<Output = Result<Option<GalleryItem>, BackendError>> + Send;

    fn insert_gallery_item(
        &self,
        item: NewGalleryItem,
    ) -> impl Future<Output = Result<GalleryItem, BackendError>> + Send;

    /// Set a row's status. An unknown id is [`BackendError::NotFound`].
    fn update_gallery_status(
        &self,
        id: GalleryItemId,
        status: MediaStatus,
    ) -> impl Future<Output = Result<GalleryItem, BackendError>> + Send;

    /// Delete a row. An unknown id is [`BackendError::NotFound`].
    fn delete_gallery_item(
        &self,
        id: GalleryItemId,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    // =========================================================================
    // Hall of fame
    // =========================================================================

    /// Profiles in ascending `position`.
    fn list_profiles(&self) -> impl Future<Output = Result<Vec<Profile>, BackendError>> + Send;

    fn get_profile(
        &self,
        id: ProfileId,
    ) -> impl Future<Output = Result<Option<Profile>, BackendError>> + Send;

    fn insert_profile(
        &self,
        profile: NewProfile,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    /// Overwrite the editable fields of a profile.
    fn update_profile(
        &self,
        id: ProfileId,
        update: ProfileUpdate,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    fn set_profile_locked(
        &self,
        id: ProfileId,
        locked: bool,
    ) -> impl Future<Output = Result<Profile, BackendError>> + Send;

    // =========================================================================
    // Storage
    // =========================================================================

    /// Store an object. Without `upsert`, an existing path is a conflict.
    fn upload_object(
        &self,
        upload: ObjectUpload,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Public URL for an object path in the configured bucket.
    fn public_url(&self, path: &str) -> String;

    // =========================================================================
    // Change feed & health
    // =========================================================================

    /// Subscribe to changes on `table`.
    fn subscribe(&self, table: Table) -> Subscription;

    /// Check that the backend is reachable.
    fn health_check(&self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// The backend selected at startup.
#[derive(Clone)]
pub enum BackendClient {
    Hosted(HostedBackend),
    Memory(MemoryBackend),
}

impl BackendClient {
    /// The in-memory backend, if that is what is running.
    #[must_use]
    pub const fn as_memory(&self) -> Option<&MemoryBackend> {
        match self {
            Self::Memory(memory) => Some(memory),
            Self::Hosted(_) => None,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Hosted(_) => "hosted",
            Self::Memory(_) => "memory",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $backend:ident => $call:expr) => {
        match $self {
            BackendClient::Hosted($backend) => $call,
            BackendClient::Memory($backend) => $call,
        }
    };
}

impl Backend for BackendClient {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, BackendError> {
        dispatch!(self, b => b.sign_in(email, password).await)
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, BackendError> {
        dispatch!(self, b => b.sign_up(email, password).await)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        dispatch!(self, b => b.sign_out(access_token).await)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        dispatch!(self, b => b.refresh_session(refresh_token).await)
    }

    async fn list_auth_users(&self) -> Result<Vec<AuthUser>, BackendError> {
        dispatch!(self, b => b.list_auth_users().await)
    }

    async fn has_role(&self, user_id: UserId, role: Role) -> Result<bool, BackendError> {
        dispatch!(self, b => b.has_role(user_id, role).await)
    }

    async fn list_role_holders(&self, role: Role) -> Result<Vec<UserId>, BackendError> {
        dispatch!(self, b => b.list_role_holders(role).await)
    }

    async fn insert_role(&self, user_id: UserId, role: Role) -> Result<(), BackendError> {
        dispatch!(self, b => b.insert_role(user_id, role).await)
    }

    async fn delete_role(&self, user_id: UserId, role: Role) -> Result<(), BackendError> {
        dispatch!(self, b => b.delete_role(user_id, role).await)
    }

    async fn list_gallery(&self, statuses: &[MediaStatus]) -> Result<Vec<GalleryItem>, BackendError> {
        dispatch!(self, b => b.list_gallery(statuses).await)
    }

    async fn get_gallery_item(&self, id: GalleryItemId) -> Result<Option<GalleryItem>, BackendError> {
        dispatch!(self, b => b.get_gallery_item(id).await)
    }

    async fn insert_gallery_item(&self, item: NewGalleryItem) -> Result<GalleryItem, BackendError> {
        dispatch!(self, b => b.insert_gallery_item(item).await)
    }

    async fn update_gallery_status(
        &self,
        id: GalleryItemId,
        status: MediaStatus,
    ) -> Result<GalleryItem, BackendError> {
        dispatch!(self, b => b.update_gallery_status(id, status).await)
    }

    async fn delete_gallery_item(&self, id: GalleryItemId) -> Result<(), BackendError> {
        dispatch!(self, b => b.delete_gallery_item(id).await)
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        dispatch!(self, b => b.list_profiles().await)
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, BackendError> {
        dispatch!(self, b => b.get_profile(id).await)
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile, BackendError> {
        dispatch!(self, b => b.insert_profile(profile).await)
    }

    async fn update_profile(
        &self,
        id: ProfileId,
        update: ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        dispatch!(self, b => b.update_profile(id, update).await)
    }

    async fn set_profile_locked(&self, id: ProfileId, locked: bool) -> Result<Profile, BackendError> {
        dispatch!(self, b => b.set_profile_locked(id, locked).await)
    }

    async fn upload_object(&self, upload: ObjectUpload) -> Result<(), BackendError> {
        dispatch!(self, b => b.upload_object(upload).await)
    }

    fn public_url(&self, path: &str) -> String {
        dispatch!(self, b => b.public_url(path))
    }

    fn subscribe(&self, table: Table) -> Subscription {
        dispatch!(self, b => b.subscribe(table))
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        dispatch!(self, b => b.health_check().await)
    }
}
