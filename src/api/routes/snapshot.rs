//! Snapshot Route
//!
//! - GET /snapshot.jpg - The next published frame as one JPEG

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::session::SnapshotSession;

/// GET /snapshot.jpg
///
/// If the client leaves before a frame arrives the transport drops this
/// future, which deregisters the subscriber.
pub async fn snapshot(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let session = SnapshotSession::new(state.hub.subscribe(), state.shutdown.child_token());
    let frame = session.capture().await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-store, no-cache"),
            (header::CONNECTION, "close"),
        ],
        Body::from(frame.into_bytes()),
    )
        .into_response())
}
