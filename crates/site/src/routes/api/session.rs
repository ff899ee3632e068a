//! Current session.

use axum::Json;

use crate::middleware::Viewer;
use crate::services::auth::SessionView;

/// The caller's identity and admin flag, without tokens.
pub async fn show(Viewer(ctx): Viewer) -> Json<SessionView> {
    Json(ctx.view())
}
