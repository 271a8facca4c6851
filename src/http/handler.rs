//! Development request handler.
//!
//! # Responsibilities
//! - Serve static files from the configured root
//! - Stream live-reload events from the pub/sub bus as server-sent events
//! - Wire up middleware (request ID, timeout, tracing)

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HandlerConfig;
use crate::pubsub::Bus;

/// Path of the live-reload event stream.
pub const LIVE_RELOAD_PATH: &str = "/__live_reload";

/// Build the router for the development server.
#[allow(deprecated)]
pub fn build(config: &HandlerConfig, bus: Bus) -> Router {
    let mut router = Router::new();
    if config.live_reload {
        router = router.route(LIVE_RELOAD_PATH, get(live_reload));
    }

    tracing::debug!(
        root = %config.root.display(),
        live_reload = config.live_reload,
        "Handler configured"
    );

    router
        .fallback_service(ServeDir::new(&config.root))
        .with_state(bus)
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Forward every bus event to the client until the bus goes away.
async fn live_reload(
    State(bus): State<Bus>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    tracing::debug!("Live reload client connected");

    let events = stream::unfold(bus.subscribe(), |mut subscription| async move {
        let event = subscription.next().await?;
        let sse = SseEvent::default().event(event.topic).data(event.payload);
        Some((Ok(sse), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use futures_util::StreamExt;
    use tower::ServiceExt;

    fn config(root: &std::path::Path, live_reload: bool) -> HandlerConfig {
        HandlerConfig {
            root: root.to_path_buf(),
            live_reload,
            request_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn serves_files_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hello</h1>").unwrap();
        let router = build(&config(dir.path(), true), Bus::default());

        let response = router
            .oneshot(Request::get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"<h1>hello</h1>");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let router = build(&config(dir.path(), true), Bus::default());

        let response = router
            .oneshot(Request::get("/nope.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn live_reload_streams_events() {
        let dir = tempfile::tempdir().unwrap();
        let bus = Bus::default();
        let router = build(&config(dir.path(), true), bus.clone());

        let response = router
            .oneshot(Request::get(LIVE_RELOAD_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        assert_eq!(bus.publish("page:reload", "/index.html"), 1);

        let mut frames = response.into_body().into_data_stream();
        let frame = tokio::time::timeout(Duration::from_secs(1), frames.next())
            .await
            .expect("event should be flushed")
            .unwrap()
            .unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.contains("event: page:reload"));
        assert!(text.contains("data: /index.html"));
    }

    #[tokio::test]
    async fn live_reload_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let router = build(&config(dir.path(), false), Bus::default());

        let response = router
            .oneshot(Request::get(LIVE_RELOAD_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
