//! Request metrics layer.
//!
//! Records request count and latency via the `metrics` crate (rendered by the
//! Prometheus exporter at `/metrics`):
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `http_requests_total` | Counter | `method`, `path`, `status` |
//! | `http_request_duration_seconds` | Histogram | `method`, `path`, `status` |
//!
//! Dynamic path segments (submission ids) are normalized so label cardinality
//! stays bounded; anything unrecognized is bucketed as `/*`.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use tower::{Layer, Service};

/// Known static paths, reported verbatim.
const KNOWN_PATHS: &[&str] = &[
    "/",
    "/health",
    "/api/health",
    "/metrics",
    "/api/contact",
    "/api/contact/demo-call",
    "/api/contact/analytics",
];

/// Tower layer for request metrics collection.
#[derive(Clone, Copy, Default)]
pub struct MetricsLayer;

impl MetricsLayer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware { inner }
    }
}

/// Metrics middleware service.
#[derive(Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let method = req.method().to_string();
        let path = normalize_path(req.uri().path());
        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;
            let duration = start.elapsed().as_secs_f64();
            let status = response.status().as_u16().to_string();

            let labels = [("method", method), ("path", path), ("status", status)];
            metrics::counter!("http_requests_total", &labels).increment(1);
            metrics::histogram!("http_request_duration_seconds", &labels).record(duration);

            Ok(response)
        })
    }
}

/// Normalize paths to a bounded label set.
fn normalize_path(path: &str) -> String {
    if KNOWN_PATHS.contains(&path) {
        return path.to_string();
    }

    // /api/contact/{id} and /api/contact/{id}/... carry dynamic ids
    if let Some(rest) = path.strip_prefix("/api/contact/") {
        let mut segments = rest.splitn(2, '/');
        if segments
            .next()
            .is_some_and(|seg| seg.parse::<i64>().is_ok())
        {
            return match segments.next() {
                Some(tail) => format!("/api/contact/:id/{tail}"),
                None => "/api/contact/:id".to_string(),
            };
        }
    }

    "/*".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_paths_pass_through() {
        assert_eq!(normalize_path("/api/contact"), "/api/contact");
        assert_eq!(normalize_path("/api/health"), "/api/health");
        assert_eq!(
            normalize_path("/api/contact/analytics"),
            "/api/contact/analytics"
        );
    }

    #[test]
    fn id_segments_normalized() {
        assert_eq!(normalize_path("/api/contact/42"), "/api/contact/:id");
        assert_eq!(
            normalize_path("/api/contact/42/status"),
            "/api/contact/:id/status"
        );
        assert_eq!(
            normalize_path("/api/contact/42/deletion-request"),
            "/api/contact/:id/deletion-request"
        );
    }

    #[test]
    fn unknown_paths_bucketed() {
        assert_eq!(normalize_path("/api/contact/not-a-number"), "/*");
        assert_eq!(normalize_path("/unknown/route"), "/*");
    }
}
