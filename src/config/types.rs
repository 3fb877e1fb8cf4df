use serde::{Deserialize, Serialize};

/// A routing rule mapping an inbound path prefix to an upstream target.
/// Immutable after the config store loads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    pub path_prefix: String,
    pub target_url: String,
    #[serde(default)]
    pub strip_prefix: bool,
}

/// Fixed-window rate-limit policy attached to an `ApiKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub interval_ms: u64,
    pub limit: u64,
}

/// A registered API key and its current policy. Mutable through the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitPolicy>,
}

/// Top-level configuration loaded at startup: server settings plus the
/// initial route table and key set that seed the Config Store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub listen: String,
    /// Upstream request timeout, in milliseconds (connect + headers + body).
    pub upstream_timeout_ms: u64,
    /// Capacity of the bounded log ring (`N` in the data model).
    pub log_buffer_capacity: usize,
    pub routes: Vec<RouteRule>,
    pub keys: Vec<ApiKey>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            upstream_timeout_ms: 10_000,
            log_buffer_capacity: 500,
            routes: Vec::new(),
            keys: Vec::new(),
        }
    }
}
