//! Admin user management endpoints.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use classfete_core::UserId;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::services::admin_users::{AdminUserService, UserSummary};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleAdmin {
    pub currently_admin: bool,
}

pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
) -> Result<Json<Vec<UserSummary>>> {
    let users = AdminUserService::new(state.backend(), state.role_in_flight())
        .list_users(&ctx)
        .await?;
    Ok(Json(users))
}

/// Toggle the admin role and return the refreshed list.
pub async fn toggle_admin(
    State(state): State<AppState>,
    RequireAdmin(ctx): RequireAdmin,
    Path(user_id): Path<UserId>,
    Json(body): Json<ToggleAdmin>,
) -> Result<Json<Vec<UserSummary>>> {
    let users = AdminUserService::new(state.backend(), state.role_in_flight())
        .toggle_admin(&ctx, user_id, body.currently_admin)
        .await?;
    Ok(Json(users))
}
