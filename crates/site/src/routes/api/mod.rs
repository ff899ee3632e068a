//! JSON API consumed by the page scripts.
//!
//! Every handler returns `Result<_, AppError>`, so failures arrive as
//! `{"error": "..."}` with the matching status code.

pub mod admin_users;
pub mod events;
pub mod gallery;
pub mod hall_of_fame;
pub mod session;
pub mod uploads;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/session", get(session::show))
        .route("/gallery", get(gallery::index))
        .route("/gallery/{id}", axum::routing::delete(gallery::delete))
        .route("/gallery/{id}/approve", post(gallery::approve))
        .route("/gallery/{id}/reject", post(gallery::reject))
        .route("/moderation/pending", get(gallery::pending))
        .route(
            "/hall-of-fame",
            get(hall_of_fame::index).post(hall_of_fame::create),
        )
        .route("/hall-of-fame/{id}", put(hall_of_fame::update))
        .route("/hall-of-fame/{id}/image", post(hall_of_fame::upload_image))
        .route("/hall-of-fame/{id}/lock", post(hall_of_fame::toggle_lock))
        .route("/admin/users", get(admin_users::index))
        .route(
            "/admin/users/{id}/toggle-admin",
            post(admin_users::toggle_admin),
        )
        .route("/uploads", post(uploads::upload))
        .route("/uploads/drafts", post(uploads::create_draft))
        .route(
            "/uploads/drafts/{id}",
            get(uploads::show_draft).delete(uploads::dismiss_draft),
        )
        .route(
            "/uploads/drafts/{id}/files/{index}/preview",
            get(uploads::preview),
        )
        .route("/uploads/drafts/{id}/files/{index}/crop", post(uploads::crop))
        .route("/uploads/drafts/{id}/submit", post(uploads::submit_draft))
        .route("/events/{table}", get(events::stream))
}
