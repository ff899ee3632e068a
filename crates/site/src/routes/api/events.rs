//! Server-sent change events.
//!
//! Each connection holds one [`Subscription`](crate::realtime::Subscription);
//! when the client disconnects the stream is dropped and the subscription with
//! it.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use classfete_core::Table;

use crate::backend::Backend;
use crate::error::{AppError, Result};
use crate::middleware::Viewer;
use crate::state::AppState;

/// Stream changes of `table` as `change` events.
///
/// The role table is only streamed to admins.
pub async fn stream(
    State(state): State<AppState>,
    Viewer(ctx): Viewer,
    Path(table): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let table: Table = table
        .parse()
        .map_err(|_| AppError::NotFound(format!("Unknown table `{table}`")))?;
    if table == Table::UserRoles && !ctx.is_admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    tracing::debug!(%table, "change stream opened");
    let events = state
        .backend()
        .subscribe(table)
        .into_stream()
        .filter_map(|change| async move {
            match Event::default().event("change").json_data(&change) {
                Ok(event) => Some(Ok(event)),
                Err(e) => {
                    tracing::warn!(error = %e, "change event not serializable");
                    None
                }
            }
        });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
