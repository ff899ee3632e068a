//! HTTP route handlers for the site.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Home (intro once per session)
//! GET  /intro/complete          - Mark intro seen, redirect /
//! POST /uploads                 - Upload form fallback (redirects with message)
//! GET  /moderation              - Admin dashboard
//! POST /moderation              - Approve/reject from the dashboard
//! POST /moderation/roles        - Toggle admin from the dashboard
//! GET  /health, /health/ready   - Liveness / backend readiness
//! GET  /media/{bucket}/{*path}  - Objects of the memory backend
//! GET  /static/app.js, site.css - Embedded assets
//!
//! # Auth
//! GET  /auth                    - Login page (?mode=register for sign-up)
//! POST /auth/login              - Login action
//! POST /auth/register           - Sign-up action
//! POST /auth/logout             - Logout action
//!
//! # API (JSON, see `api`)
//! /api/...
//! ```

pub mod api;
pub mod assets;
pub mod auth;
pub mod health;
pub mod media;
pub mod pages;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth_rate_limiter, create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let forms = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));
    let forms = match auth_rate_limiter() {
        Some(limiter) => forms.layer(limiter),
        None => {
            tracing::warn!("auth rate limiter unavailable, running without it");
            forms
        }
    };

    Router::new()
        .route("/", get(auth::auth_page))
        .route("/logout", post(auth::logout))
        .merge(forms)
}

/// Create all routes for the site.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::home))
        .route("/intro/complete", get(pages::intro_complete))
        .route("/uploads", post(pages::upload))
        .route(
            "/moderation",
            get(pages::moderation).post(pages::moderation_action),
        )
        .route("/moderation/roles", post(pages::role_action))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/media/{bucket}/{*path}", get(media::object))
        .route("/static/app.js", get(assets::app_js))
        .route("/static/site.css", get(assets::site_css))
        .nest("/auth", auth_routes())
        .nest("/api", api::routes())
}

/// The full application: routes, sessions, request ids, tracing and the body
/// limit for uploads.
///
/// Sentry layers are added by the binary around this router.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());
    let body_limit = DefaultBodyLimit::max(state.config().max_request_bytes);

    routes()
        .layer(body_limit)
        .layer(session_layer)
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
