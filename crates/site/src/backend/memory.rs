//! In-process backend.
//!
//! Holds every table, the auth users and the object store in memory. Used
//! when no `BACKEND_URL` is configured and by the test suites. Passwords are
//! hashed with argon2 exactly as a real auth service would store them.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use classfete_core::{
    ChangeEvent, ChangeKind, Email, GalleryItemId, MediaStatus, ProfileId, Role, Table, UserId,
};

use super::{
    AuthSession, AuthUser, Backend, BackendError, GalleryItem, NewGalleryItem, NewProfile,
    ObjectUpload, Profile, ProfileUpdate, SignUpOutcome,
};
use crate::realtime::{ChangeFeed, Subscription};

/// Default access token lifetime.
const DEFAULT_TOKEN_TTL: TimeDelta = TimeDelta::hours(1);

type UploadFault = Box<dyn Fn(&ObjectUpload) -> bool + Send + Sync>;

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

struct MemoryUser {
    user: AuthUser,
    password_hash: String,
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, MemoryUser>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    roles: HashSet<(UserId, Role)>,
    gallery: Vec<GalleryItem>,
    profiles: HashMap<ProfileId, Profile>,
    objects: HashMap<String, StoredObject>,
}

struct MemoryInner {
    state: Mutex<MemoryState>,
    feed: ChangeFeed,
    public_base: String,
    bucket: String,
    token_ttl: Mutex<TimeDelta>,
    upload_fault: Mutex<Option<UploadFault>>,
    role_reads_fail: Mutex<bool>,
}

/// Complete in-memory [`Backend`].
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

impl MemoryBackend {
    /// Create an empty backend.
    ///
    /// Public URLs are `{site_base_url}/media/{bucket}/{path}`; the site
    /// serves those paths from this backend's object store.
    #[must_use]
    pub fn new(site_base_url: &str, bucket: &str) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                state: Mutex::new(MemoryState::default()),
                feed: ChangeFeed::new(),
                public_base: format!("{}/media", site_base_url.trim_end_matches('/')),
                bucket: bucket.to_string(),
                token_ttl: Mutex::new(DEFAULT_TOKEN_TTL),
                upload_fault: Mutex::new(None),
                role_reads_fail: Mutex::new(false),
            }),
        }
    }

    /// Storage bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.inner.bucket
    }

    /// Fetch a stored object by path.
    #[must_use]
    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.state().objects.get(path).cloned()
    }

    /// Paths of every stored object, sorted.
    #[must_use]
    pub fn object_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.state().objects.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// The change feed mutations are published on.
    #[must_use]
    pub fn feed(&self) -> &ChangeFeed {
        &self.inner.feed
    }

    /// Make uploads matching `predicate` fail with an API error.
    pub fn fail_uploads_where(
        &self,
        predicate: impl Fn(&ObjectUpload) -> bool + Send + Sync + 'static,
    ) {
        *lock(&self.inner.upload_fault) = Some(Box::new(predicate));
    }

    /// Make role-table reads fail (or succeed again).
    pub fn fail_role_reads(&self, fail: bool) {
        *lock(&self.inner.role_reads_fail) = fail;
    }

    /// Change the lifetime of newly issued access tokens.
    pub fn set_token_ttl(&self, ttl: TimeDelta) {
        *lock(&self.inner.token_ttl) = ttl;
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.inner.state)
    }

    fn issue_session(&self, state: &mut MemoryState, user: &AuthUser) -> AuthSession {
        let access_token = Uuid::new_v4().simple().to_string();
        let refresh_token = Uuid::new_v4().simple().to_string();
        state.access_tokens.insert(access_token.clone(), user.id);
        state.refresh_tokens.insert(refresh_token.clone(), user.id);

        AuthSession {
            access_token,
            refresh_token,
            expires_at: Utc::now() + *lock(&self.inner.token_ttl),
            user: user.clone(),
        }
    }

    fn check_role_reads(&self) -> Result<(), BackendError> {
        if *lock(&self.inner.role_reads_fail) {
            return Err(BackendError::Api {
                status: 503,
                message: "role table unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn publish(&self, table: Table, kind: ChangeKind, row_id: impl ToString) {
        self.inner.feed.publish(ChangeEvent::row(table, kind, row_id));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn hash_password(password: &str) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Parse(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

fn invalid_credentials() -> BackendError {
    BackendError::Unauthorized("Invalid login credentials".to_string())
}

/// Stable sort, so later inserts stay first among equal timestamps.
fn newest_first(items: &mut [GalleryItem]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl Backend for MemoryBackend {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state();
        let user = state
            .users
            .values()
            .find(|u| u.user.email.as_deref() == Some(email.as_str()))
            .filter(|u| verify_password(password, &u.password_hash))
            .map(|u| u.user.clone())
            .ok_or_else(invalid_credentials)?;

        Ok(self.issue_session(&mut state, &user))
    }

    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, BackendError> {
        let password_hash = hash_password(password)?;
        let mut state = self.state();

        if state
            .users
            .values()
            .any(|u| u.user.email.as_deref() == Some(email.as_str()))
        {
            return Err(BackendError::Conflict("User already registered".to_string()));
        }

        let user = AuthUser {
            id: UserId::random(),
            email: Some(email.as_str().to_string()),
            created_at: Utc::now(),
        };
        state.users.insert(
            user.id,
            MemoryUser {
                user: user.clone(),
                password_hash,
            },
        );

        Ok(SignUpOutcome::SignedIn(self.issue_session(&mut state, &user)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        if let Some(user_id) = state.access_tokens.remove(access_token) {
            state.refresh_tokens.retain(|_, owner| *owner != user_id);
        }
        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let mut state = self.state();
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or_else(|| BackendError::Unauthorized("Invalid refresh token".to_string()))?;
        let user = state
            .users
            .get(&user_id)
            .map(|u| u.user.clone())
            .ok_or_else(|| BackendError::NotFound(format!("user {user_id}")))?;

        Ok(self.issue_session(&mut state, &user))
    }

    async fn list_auth_users(&self) -> Result<Vec<AuthUser>, BackendError> {
        let mut users: Vec<AuthUser> = self.state().users.values().map(|u| u.user.clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    async fn has_role(&self, user_id: UserId, role: Role) -> Result<bool, BackendError> {
        self.check_role_reads()?;
        Ok(self.state().roles.contains(&(user_id, role)))
    }

    async fn list_role_holders(&self, role: Role) -> Result<Vec<UserId>, BackendError> {
        self.check_role_reads()?;
        let mut holders: Vec<UserId> = self
            .state()
            .roles
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(user_id, _)| *user_id)
            .collect();
        holders.sort();
        Ok(holders)
    }

    async fn insert_role(&self, user_id: UserId, role: Role) -> Result<(), BackendError> {
        if !self.state().roles.insert((user_id, role)) {
            return Err(BackendError::Conflict(format!(
                "user {user_id} already has role {role}"
            )));
        }
        self.publish(Table::UserRoles, ChangeKind::Insert, user_id);
        Ok(())
    }

    async fn delete_role(&self, user_id: UserId, role: Role) -> Result<(), BackendError> {
        if self.state().roles.remove(&(user_id, role)) {
            self.publish(Table::UserRoles, ChangeKind::Delete, user_id);
        }
        Ok(())
    }

    async fn list_gallery(&self, statuses: &[MediaStatus]) -> Result<Vec<GalleryItem>, BackendError> {
        let mut items: Vec<GalleryItem> = self
            .state()
            .gallery
            .iter()
            .rev()
            .filter(|item| statuses.contains(&item.status))
            .cloned()
            .collect();
        newest_first(&mut items);
        Ok(items)
    }

    async fn get_gallery_item(&self, id: GalleryItemId) -> Result<Option<GalleryItem>, BackendError> {
        Ok(self.state().gallery.iter().find(|item| item.id == id).cloned())
    }

    async fn insert_gallery_item(&self, item: NewGalleryItem) -> Result<GalleryItem, BackendError> {
        let row = GalleryItem {
            id: GalleryItemId::random(),
            title: item.title,
            description: item.description,
            image_url: item.image_url,
            status: item.status,
            created_at: Utc::now(),
        };
        self.state().gallery.push(row.clone());
        self.publish(Table::GalleryItems, ChangeKind::Insert, row.id);
        Ok(row)
    }

    async fn update_gallery_status(
        &self,
        id: GalleryItemId,
        status: MediaStatus,
    ) -> Result<GalleryItem, BackendError> {
        let row = {
            let mut state = self.state();
            let row = state
                .gallery
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| BackendError::NotFound(format!("gallery item {id}")))?;
            row.status = status;
            row.clone()
        };
        self.publish(Table::GalleryItems, ChangeKind::Update, id);
        Ok(row)
    }

    async fn delete_gallery_item(&self, id: GalleryItemId) -> Result<(), BackendError> {
        {
            let mut state = self.state();
            let before = state.gallery.len();
            state.gallery.retain(|item| item.id != id);
            if state.gallery.len() == before {
                return Err(BackendError::NotFound(format!("gallery item {id}")));
            }
        }
        self.publish(Table::GalleryItems, ChangeKind::Delete, id);
        Ok(())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        let mut profiles: Vec<Profile> = self.state().profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(profiles)
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, BackendError> {
        Ok(self.state().profiles.get(&id).cloned())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile, BackendError> {
        let row = Profile {
            id: ProfileId::random(),
            name: profile.name,
            image_url: profile.image_url,
            social_link_1: profile.social_link_1,
            social_link_2: profile.social_link_2,
            position: profile.position,
            locked: false,
        };
        self.state().profiles.insert(row.id, row.clone());
        self.publish(Table::HallOfFame, ChangeKind::Insert, row.id);
        Ok(row)
    }

    async fn update_profile(
        &self,
        id: ProfileId,
        update: ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        let row = {
            let mut state = self.state();
            let row = state
                .profiles
                .get_mut(&id)
                .ok_or_else(|| BackendError::NotFound(format!("profile {id}")))?;
            row.name = update.name;
            row.image_url = update.image_url;
            row.social_link_1 = update.social_link_1;
            row.social_link_2 = update.social_link_2;
            row.clone()
        };
        self.publish(Table::HallOfFame, ChangeKind::Update, id);
        Ok(row)
    }

    async fn set_profile_locked(&self, id: ProfileId, locked: bool) -> Result<Profile, BackendError> {
        let row = {
            let mut state = self.state();
            let row = state
                .profiles
                .get_mut(&id)
                .ok_or_else(|| BackendError::NotFound(format!("profile {id}")))?;
            row.locked = locked;
            row.clone()
        };
        self.publish(Table::HallOfFame, ChangeKind::Update, id);
        Ok(row)
    }

    async fn upload_object(&self, upload: ObjectUpload) -> Result<(), BackendError> {
        if lock(&self.inner.upload_fault)
            .as_ref()
            .is_some_and(|fault| fault(&upload))
        {
            return Err(BackendError::Api {
                status: 500,
                message: format!("injected upload failure for {}", upload.path),
            });
        }

        let mut state = self.state();
        if !upload.upsert && state.objects.contains_key(&upload.path) {
            return Err(BackendError::Conflict(format!(
                "object {} already exists",
                upload.path
            )));
        }
        state.objects.insert(
            upload.path,
            StoredObject {
                bytes: upload.bytes,
                content_type: upload.content_type,
            },
        );
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}/{path}", self.inner.public_base, self.inner.bucket)
    }

    fn subscribe(&self, table: Table) -> Subscription {
        self.inner.feed.subscribe(table)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
