//! REST client for a Supabase-compatible hosted backend.
//!
//! # API Reference
//!
//! - Rows: `{url}/rest/v1/{table}` (PostgREST filters `eq.`, `in.`, `order=`)
//! - Storage: `{url}/storage/v1/object/{bucket}/{path}`
//! - Auth: `{url}/auth/v1/*` (token, signup, logout, admin/users)
//!
//! Row, storage and admin calls authenticate with the service-role key.
//! Sign-in and sign-up use the anon key, exactly like a browser client would.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use classfete_core::{
    ChangeEvent, ChangeKind, Email, GalleryItemId, MediaStatus, ProfileId, Role, Table, UserId,
};

use super::{
    AuthSession, AuthUser, Backend, BackendError, GalleryItem, NewGalleryItem, NewProfile,
    ObjectUpload, Profile, ProfileUpdate, SignUpOutcome,
};
use crate::config::BackendConfig;
use crate::realtime::{ChangeFeed, Subscription};

/// Page size for the auth admin user listing.
const ADMIN_USERS_PER_PAGE: usize = 200;

/// Hosted backend client.
///
/// Cheap to clone; all clones share one HTTP connection pool and change feed.
#[derive(Clone)]
pub struct HostedBackend {
    inner: Arc<HostedBackendInner>,
}

struct HostedBackendInner {
    client: reqwest::Client,
    url: String,
    anon_key: SecretString,
    service_role_key: SecretString,
    bucket: String,
    feed: ChangeFeed,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(|| Utc::now() + TimeDelta::seconds(self.expires_in.unwrap_or(3600)));

        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

#[derive(Debug, Deserialize)]
struct AdminUsersPage {
    users: Vec<AuthUser>,
}

#[derive(Debug, Deserialize)]
struct RoleHolderRow {
    user_id: UserId,
}

/// Error body shapes returned by PostgREST, storage and auth.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    code: Option<serde_json::Value>,
    #[serde(rename = "statusCode")]
    status_code: Option<serde_json::Value>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
    }

    fn is_duplicate(&self) -> bool {
        let code = self.code.as_ref().map(ToString::to_string).unwrap_or_default();
        let status = self
            .status_code
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        code.contains("23505")
            || status.contains("409")
            || self.error.as_deref() == Some("Duplicate")
            || self.error_code.as_deref() == Some("user_already_exists")
    }

    fn is_invalid_grant(&self) -> bool {
        self.error.as_deref() == Some("invalid_grant")
            || self.error_code.as_deref() == Some("invalid_credentials")
    }
}

/// Map a failed response body to a [`BackendError`].
fn classify_error(status: StatusCode, body: &str) -> BackendError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message().unwrap_or_else(|| body.to_string());

    if status == StatusCode::CONFLICT || parsed.is_duplicate() {
        return BackendError::Conflict(message);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || parsed.is_invalid_grant()
    {
        return BackendError::Unauthorized(message);
    }
    if status == StatusCode::NOT_FOUND {
        return BackendError::NotFound(message);
    }
    BackendError::Api {
        status: status.as_u16(),
        message,
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl HostedBackend {
    /// Create a new hosted backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig, bucket: &str) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("classfete/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(HostedBackendInner {
                client,
                url: config.url.trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                service_role_key: config.service_role_key.clone(),
                bucket: bucket.to_string(),
                feed: ChangeFeed::new(),
            }),
        })
    }

    fn rest_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{table}", self.inner.url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.inner.url)
    }

    /// Attach the service-role key.
    fn service(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.inner.service_role_key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    /// Attach the anon key.
    fn anon(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.inner.anon_key.expose_secret())
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Handle an API response whose body is not needed.
    async fn handle_empty(response: Response) -> Result<(), BackendError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    /// Parse error response from the backend.
    async fn parse_error(response: Response) -> BackendError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        classify_error(status, &body)
    }

    /// Select rows from `table` with query parameters.
    async fn select<T: DeserializeOwned>(
        &self,
        table: Table,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let response = self
            .service(self.inner.client.get(self.rest_url(table)))
            .query(query)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Insert one row and return its representation.
    async fn insert_one<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        table: Table,
        body: &B,
    ) -> Result<T, BackendError> {
        let response = self
            .service(self.inner.client.post(self.rest_url(table)))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = Self::handle_response(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse(format!("insert into {table} returned no row")))
    }

    /// Patch the row with `id` and return its new representation.
    async fn update_by_id<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        table: Table,
        id: impl std::fmt::Display + Send,
        body: &B,
    ) -> Result<T, BackendError> {
        let id = id.to_string();
        let response = self
            .service(self.inner.client.patch(self.rest_url(table)))
            .query(&[("id", eq(&id))])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let rows: Vec<T> = Self::handle_response(response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{table} row {id}")))
    }

    fn publish(&self, table: Table, kind: ChangeKind, row_id: impl ToString) {
        self.inner.feed.publish(ChangeEvent::row(table, kind, row_id));
    }
}

impl Backend for HostedBackend {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .anon(self.inner.client.post(self.auth_url("/token")))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email.as_str(), "password": password }))
            .send()
            .await?;
        let token: TokenResponse = Self::handle_response(response).await?;
        Ok(token.into_session())
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_up(&self, email: &Email, password: &str) -> Result<SignUpOutcome, BackendError> {
        let response = self
            .anon(self.inner.client.post(self.auth_url("/signup")))
            .json(&serde_json::json!({ "email": email.as_str(), "password": password }))
            .send()
            .await?;
        let outcome = match Self::handle_response(response).await? {
            SignUpResponse::Session(token) => SignUpOutcome::SignedIn(token.into_session()),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user),
        };
        Ok(outcome)
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let response = self
            .anon(self.inner.client.post(self.auth_url("/logout")))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let response = self
            .anon(self.inner.client.post(self.auth_url("/token")))
            .query(&[("grant_type", "refresh_token")])
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let token: TokenResponse = Self::handle_response(response).await?;
        Ok(token.into_session())
    }

    #[instrument(skip(self))]
    async fn list_auth_users(&self) -> Result<Vec<AuthUser>, BackendError> {
        let mut users = Vec::new();
        let mut page = 1_usize;

        loop {
            let response = self
                .service(self.inner.client.get(self.auth_url("/admin/users")))
                .query(&[
                    ("page", page.to_string()),
                    ("per_page", ADMIN_USERS_PER_PAGE.to_string()),
                ])
                .send()
                .await?;
            let batch: AdminUsersPage = Self::handle_response(response).await?;
            let count = batch.users.len();
            users.extend(batch.users);

            if count < ADMIN_USERS_PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(users)
    }

    #[instrument(skip(self))]
    async fn has_role(&self, user_id: UserId, role: Role) -> Result<bool, BackendError> {
        let rows: Vec<RoleHolderRow> = self
            .select(
                Table::UserRoles,
                &[
                    ("select", "user_id".to_string()),
                    ("user_id", eq(user_id)),
                    ("role", eq(role)),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    #[instrument(skip(self))]
    async fn list_role_holders(&self, role: Role) -> Result<Vec<UserId>, BackendError> {
        let rows: Vec<RoleHolderRow> = self
            .select(
                Table::UserRoles,
                &[("select", "user_id".to_string()), ("role", eq(role))],
            )
            .await?;
        Ok(rows.into_iter().map(|row| row.user_id).collect())
    }

    #[instrument(skip(self))]
    async fn insert_role(&self, user_id: UserId, role: Role) -> Result<(), BackendError> {
        let response = self
            .service(self.inner.client.post(self.rest_url(Table::UserRoles)))
            .header("Prefer", "return=minimal")
            .json(&super::UserRole { user_id, role })
            .send()
            .await?;
        Self::handle_empty(response).await?;
        self.publish(Table::UserRoles, ChangeKind::Insert, user_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_role(&self, user_id: UserId, role: Role) -> Result<(), BackendError> {
        let response = self
            .service(self.inner.client.delete(self.rest_url(Table::UserRoles)))
            .query(&[("user_id", eq(user_id)), ("role", eq(role))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let removed: Vec<serde_json::Value> = Self::handle_response(response).await?;
        if !removed.is_empty() {
            self.publish(Table::UserRoles, ChangeKind::Delete, user_id);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_gallery(&self, statuses: &[MediaStatus]) -> Result<Vec<GalleryItem>, BackendError> {
        let statuses = statuses
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.select(
            Table::GalleryItems,
            &[
                ("select", "*".to_string()),
                ("status", format!("in.({statuses})")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_gallery_item(&self, id: GalleryItemId) -> Result<Option<GalleryItem>, BackendError> {
        let rows: Vec<GalleryItem> = self
            .select(
                Table::GalleryItems,
                &[("select", "*".to_string()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, item), fields(status = %item.status))]
    async fn insert_gallery_item(&self, item: NewGalleryItem) -> Result<GalleryItem, BackendError> {
        let row: GalleryItem = self.insert_one(Table::GalleryItems, &item).await?;
        self.publish(Table::GalleryItems, ChangeKind::Insert, row.id);
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn update_gallery_status(
        &self,
        id: GalleryItemId,
        status: MediaStatus,
    ) -> Result<GalleryItem, BackendError> {
        let row: GalleryItem = self
            .update_by_id(
                Table::GalleryItems,
                id,
                &serde_json::json!({ "status": status }),
            )
            .await?;
        self.publish(Table::GalleryItems, ChangeKind::Update, id);
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn delete_gallery_item(&self, id: GalleryItemId) -> Result<(), BackendError> {
        let response = self
            .service(self.inner.client.delete(self.rest_url(Table::GalleryItems)))
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let removed: Vec<serde_json::Value> = Self::handle_response(response).await?;
        if removed.is_empty() {
            return Err(BackendError::NotFound(format!("gallery item {id}")));
        }
        self.publish(Table::GalleryItems, ChangeKind::Delete, id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        self.select(
            Table::HallOfFame,
            &[
                ("select", "*".to_string()),
                ("order", "position.asc".to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, BackendError> {
        let rows: Vec<Profile> = self
            .select(
                Table::HallOfFame,
                &[("select", "*".to_string()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, profile), fields(name = %profile.name, position = profile.position))]
    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile, BackendError> {
        let row: Profile = self.insert_one(Table::HallOfFame, &profile).await?;
        self.publish(Table::HallOfFame, ChangeKind::Insert, row.id);
        Ok(row)
    }

    #[instrument(skip(self, update))]
    async fn update_profile(
        &self,
        id: ProfileId,
        update: ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        let row: Profile = self.update_by_id(Table::HallOfFame, id, &update).await?;
        self.publish(Table::HallOfFame, ChangeKind::Update, id);
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn set_profile_locked(&self, id: ProfileId, locked: bool) -> Result<Profile, BackendError> {
        let row: Profile = self
            .update_by_id(
                Table::HallOfFame,
                id,
                &serde_json::json!({ "locked": locked }),
            )
            .await?;
        self.publish(Table::HallOfFame, ChangeKind::Update, id);
        Ok(row)
    }

    #[instrument(skip(self, upload), fields(path = %upload.path, size = upload.bytes.len(), upsert = upload.upsert))]
    async fn upload_object(&self, upload: ObjectUpload) -> Result<(), BackendError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.inner.url,
            self.inner.bucket,
            urlencoding::encode(&upload.path)
        );
        let response = self
            .service(self.inner.client.post(url))
            .header("Content-Type", upload.content_type)
            .header("x-upsert", if upload.upsert { "true" } else { "false" })
            .body(upload.bytes)
            .send()
            .await?;
        Self::handle_empty(response).await
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.inner.url,
            self.inner.bucket,
            urlencoding::encode(path)
        )
    }

    fn subscribe(&self, table: Table) -> Subscription {
        self.inner.feed.subscribe(table)
    }

    async fn health_check(&self) -> Result<(), BackendError> {
        let response = self
            .anon(self.inner.client.get(self.auth_url("/health")))
            .send()
            .await?;
        Self::handle_empty(response).await
    }
}
