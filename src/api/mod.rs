//! HTTP API
//!
//! HTTP surface of the relay, built with Axum.
//!
//! # Endpoints
//!
//! ## Video
//! - `GET /mjpeg` - Live `multipart/x-mixed-replace` feed
//! - `GET /snapshot.jpg` - The next frame as a single JPEG
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Stream and subscriber statistics
//!
//! Any other method on these routes is answered with `405 Method Not Allowed`
//! before a handler runs, so no subscriber is registered.
//!
//! # Example
//!
//! ```rust,ignore
//! use mjpeg_relay::api::{serve, ApiConfig, AppState};
//! use mjpeg_relay::frame::ReaderStats;
//! use mjpeg_relay::hub::FrameHub;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = Arc::new(FrameHub::default());
//!     let config = ApiConfig::default();
//!     let state = AppState::new(hub, Arc::new(ReaderStats::default()), config.clone());
//!     serve(state, &config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::{ApiConfig, AppState};

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Build the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .route("/mjpeg", get(routes::stream::mjpeg_stream))
        .route("/snapshot.jpg", get(routes::snapshot::snapshot))
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Start the HTTP server
///
/// Returns after the shutdown token is cancelled (by a signal or by the
/// caller) and open connections have finished.
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("MJPEG relay listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("HTTP server shut down gracefully");
    Ok(())
}

/// Wait for a shutdown signal or for `cancel` to fire, then cancel it so
/// every open session ends
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, ReaderStats};
    use crate::hub::FrameHub;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use bytes::Bytes;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tower::util::ServiceExt;

    fn frame(sequence: u64) -> Frame {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&sequence.to_be_bytes());
        data.extend_from_slice(&[0xFF, 0xD9]);
        Frame::new(sequence, Bytes::from(data)).unwrap()
    }

    fn create_test_app() -> (Router, Arc<FrameHub>) {
        let hub = Arc::new(FrameHub::default());
        let state = AppState::new(
            Arc::clone(&hub),
            Arc::new(ReaderStats::default()),
            ApiConfig::default(),
        );
        (build_router(state), hub)
    }

    /// Publish a frame every few milliseconds until the handle is aborted
    fn spawn_producer(hub: Arc<FrameHub>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            for i in 0.. {
                hub.publish(&frame(i));
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    }

    async fn wait_for_no_subscribers(hub: &FrameHub) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while hub.subscriber_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber was not deregistered");
    }

    #[tokio::test]
    async fn test_health_live() {
        let (app, _hub) = create_test_app();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_full() {
        let (app, hub) = create_test_app();
        hub.publish(&frame(0));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["subscribers"], 0);
        assert_eq!(json["frames_published"], 1);
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_non_get_rejected_without_registration() {
        for uri in ["/mjpeg", "/snapshot.jpg"] {
            let (app, hub) = create_test_app();

            let response = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(hub.subscriber_count(), 0);
            assert_eq!(hub.stats().frames_published, 0);
        }
    }

    #[tokio::test]
    async fn test_snapshot_returns_one_frame() {
        let (app, hub) = create_test_app();
        let producer = spawn_producer(Arc::clone(&hub));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/snapshot.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        producer.abort();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store, no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "close");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(&[0xFF, 0xD8]));
        assert!(body.ends_with(&[0xFF, 0xD9]));
        assert_eq!(body.len(), 12);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_unavailable_after_close() {
        let (app, hub) = create_test_app();
        hub.close();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/snapshot.jpg")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_mjpeg_stream_delivers_parts() {
        let (app, hub) = create_test_app();

        let response = app
            .oneshot(Request::builder().uri("/mjpeg").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "multipart/x-mixed-replace;boundary=--boundary"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store, no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "close");
        assert_eq!(hub.subscriber_count(), 1);

        let producer = spawn_producer(Arc::clone(&hub));
        let mut body = response.into_body().into_data_stream();

        let header_chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let text = String::from_utf8(header_chunk.to_vec()).unwrap();
        assert!(text.starts_with("----boundary\r\n"));
        assert!(text.contains("Content-Type: image/jpeg\r\n"));
        assert!(text.contains("Content-Length: 12\r\n"));
        assert!(text.ends_with("\r\n\r\n"));

        let payload = body.next().await.unwrap().unwrap();
        assert!(payload.starts_with(&[0xFF, 0xD8]));
        assert!(payload.ends_with(&[0xFF, 0xD9]));

        // Client goes away
        drop(body);
        wait_for_no_subscribers(&hub).await;
        producer.abort();
    }

    #[tokio::test]
    async fn test_mjpeg_stream_ends_on_shutdown() {
        let hub = Arc::new(FrameHub::default());
        let state = AppState::new(
            Arc::clone(&hub),
            Arc::new(ReaderStats::default()),
            ApiConfig::default(),
        );
        let shutdown = state.shutdown.clone();
        let app = build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/mjpeg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(hub.subscriber_count(), 1);

        shutdown.cancel();
        wait_for_no_subscribers(&hub).await;

        // Body ends once the session has released its sink
        let body = tokio::time::timeout(
            Duration::from_secs(2),
            axum::body::to_bytes(response.into_body(), usize::MAX),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(body.is_empty());
    }
}
