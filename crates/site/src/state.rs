//! Application state shared across handlers.

use std::sync::Arc;

use classfete_core::{GalleryItemId, UserId};

use crate::backend::{BackendClient, BackendError, HostedBackend, MemoryBackend};
use crate::config::SiteConfig;
use crate::inflight::InFlight;
use crate::services::drafts::DraftStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SiteConfig,
    backend: BackendClient,
    drafts: DraftStore,
    moderation_in_flight: InFlight<GalleryItemId>,
    role_in_flight: InFlight<UserId>,
}

impl AppState {
    /// Create the state, connecting to the hosted backend when one is
    /// configured and falling back to the in-memory backend otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client for the hosted backend cannot be
    /// built.
    pub fn new(config: SiteConfig) -> Result<Self, BackendError> {
        let backend = match &config.backend {
            Some(backend) => {
                BackendClient::Hosted(HostedBackend::new(backend, &config.storage_bucket)?)
            }
            None => BackendClient::Memory(MemoryBackend::new(
                &config.base_url,
                &config.storage_bucket,
            )),
        };
        Ok(Self::with_backend(config, backend))
    }

    /// Create the state around an existing backend.
    #[must_use]
    pub fn with_backend(config: SiteConfig, backend: BackendClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                drafts: DraftStore::default(),
                moderation_in_flight: InFlight::new(),
                role_in_flight: InFlight::new(),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Upload drafts awaiting submit.
    #[must_use]
    pub fn drafts(&self) -> &DraftStore {
        &self.inner.drafts
    }

    /// Gallery rows with a moderation action running.
    #[must_use]
    pub fn moderation_in_flight(&self) -> &InFlight<GalleryItemId> {
        &self.inner.moderation_in_flight
    }

    /// Users with a role toggle running.
    #[must_use]
    pub fn role_in_flight(&self) -> &InFlight<UserId> {
        &self.inner.role_in_flight
    }
}
