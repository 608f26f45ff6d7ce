//! Stream Route
//!
//! - GET /mjpeg - Live `multipart/x-mixed-replace` feed
//!
//! The handler registers a subscriber, commits the response headers and
//! hands the connection to a `StreamSession` running in its own task. The
//! session writes into a channel the response body streams from; when the
//! transport drops the body the session is cancelled.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::session::{ChannelSink, MultipartWriter, StreamSession, BOUNDARY};

/// GET /mjpeg
pub async fn mjpeg_stream(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let config = &state.config.stream;

    let (sink, body_rx) = ChannelSink::channel(config.body_buffer, config.write_timeout);
    let writer = MultipartWriter::new(sink, BOUNDARY);

    let content_type = HeaderValue::from_str(&writer.content_type())
        .map_err(|e| ApiError::Internal(format!("Invalid boundary: {}", e)))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store, no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));
    headers.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );

    let cancel = state.shutdown.child_token();
    writer.get_ref().watch_disconnect(cancel.clone());

    let session = StreamSession::new(state.hub.subscribe(), writer, cancel, config);
    tracing::info!(subscriber_id = %session.id(), "Stream client connected");
    tokio::spawn(session.run());

    let body = Body::from_stream(stream::unfold(body_rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(chunk), rx))
    }));

    Ok((StatusCode::OK, headers, body).into_response())
}
