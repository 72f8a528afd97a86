//! Request logging with correlation ids.
//!
//! The id comes from the inbound `X-Correlation-ID` header or is generated,
//! lives in task-local storage for the duration of the request, is recorded
//! on the request span so every log line carries it, and is echoed on the
//! response.

use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

tokio::task_local! {
    static CORRELATION_ID: String;
}

/// Correlation id of the request being handled on this task, if any.
pub fn current_correlation_id() -> Option<String> {
    CORRELATION_ID.try_with(|id| id.clone()).ok()
}

pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

pub async fn track_request(req: Request, next: Next) -> Response {
    let correlation_id = req
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(generate_correlation_id);

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let span = info_span!("http_request", correlation_id = %correlation_id);

    let handle = async move {
        info!(%method, %path, "request received");
        let started = Instant::now();
        let mut res = next.run(req).await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let status = res.status();
        info!(%method, %path, status = status.as_u16(), duration_ms, "request completed");

        if let Some(id) = current_correlation_id() {
            if let Ok(value) = HeaderValue::from_str(&id) {
                res.headers_mut()
                    .insert(HeaderName::from_static("x-correlation-id"), value);
            }
        }
        res
    };

    CORRELATION_ID
        .scope(correlation_id, handle.instrument(span))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::capture_logs;
    use axum::{body::Body, http::Request as HttpRequest, routing::get, Router};
    use tower::ServiceExt;
    use tracing::Level;

    fn app() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|| async { current_correlation_id().unwrap_or_default() }),
            )
            .route("/gone", get(|| async { axum::http::StatusCode::NOT_FOUND }))
            .layer(axum::middleware::from_fn(track_request))
    }

    #[tokio::test]
    async fn echoes_inbound_correlation_id() {
        let res = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/echo")
                    .header(CORRELATION_ID_HEADER, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.headers()[CORRELATION_ID_HEADER], "abc-123");
    }

    #[tokio::test]
    async fn generates_id_and_exposes_it_to_handlers() {
        use http_body_util::BodyExt;

        let res = app()
            .oneshot(HttpRequest::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let header = res.headers()[CORRELATION_ID_HEADER].to_str().unwrap().to_owned();
        assert!(Uuid::parse_str(&header).is_ok());

        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, header.as_bytes());
    }

    #[tokio::test]
    async fn logs_start_and_completion() {
        let (logs, _guard) = capture_logs();
        let res = app()
            .oneshot(HttpRequest::builder().uri("/gone").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), 404);

        let start = logs.find(Level::INFO, "request received").expect("start log");
        assert_eq!(start.field("method"), Some("GET"));
        assert_eq!(start.field("path"), Some("/gone"));
        let done = logs.find(Level::INFO, "request completed").expect("end log");
        assert_eq!(done.field("status"), Some("404"));
        assert!(done.field("duration_ms").is_some());
    }

    #[test]
    fn no_correlation_id_outside_a_request() {
        assert!(current_correlation_id().is_none());
    }
}
