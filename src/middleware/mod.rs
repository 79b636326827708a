//! HTTP middleware: client IP extraction, request IDs, metrics, rate limiting.

pub mod client_ip;
pub mod metrics;
pub mod rate_limit;
pub mod request_id;

pub use client_ip::ClientIp;
pub use metrics::MetricsLayer;
pub use rate_limit::RateLimiter;
pub use request_id::{RequestId, RequestIdLayer};
