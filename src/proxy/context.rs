use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use std::net::IpAddr;
use std::time::Instant;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

/// Per-request context that flows through every phase of the pipeline and
/// accumulates exactly what the final log record needs.
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub client_ip: IpAddr,
    pub start: Instant,
    pub api_key: String,
    pub target_url: String,
}

impl RequestContext {
    pub fn new(method: String, path: String, client_ip: IpAddr) -> Self {
        Self {
            method,
            path,
            client_ip,
            start: Instant::now(),
            api_key: String::new(),
            target_url: String::new(),
        }
    }

    /// Build a JSON error response for a refused request. This is the single
    /// exit point for every non-2xx gateway-originated response.
    pub fn error_response(&self, status: StatusCode, message: &str) -> hyper::Response<BoxBody> {
        let body = serde_json::json!({ "error": message }).to_string();
        hyper::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(full_body(body))
            .unwrap()
    }

    /// Record request-count and latency metrics for the completed request.
    pub fn finalize_metrics(&self, status_code: u16) {
        let mut buf = itoa::Buffer::new();
        let status_str = buf.format(status_code);

        metrics::counter!(
            "gateway_requests_total",
            "method" => self.method.clone(),
            "status_code" => status_str.to_owned(),
        )
        .increment(1);

        metrics::histogram!("gateway_request_duration_seconds")
            .record(self.start.elapsed().as_secs_f64());
    }
}
