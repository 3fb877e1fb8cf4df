use crate::config::{ApiKey, GatewayConfig, RateLimitPolicy};
use crate::error::GatewayError;
use crate::logbuf::LogBuffer;
use crate::metrics::Metrics;
use crate::ratelimit::RateLimiter;
use crate::routing::{CompiledRoute, RouteTable};
use crate::upstream::{self, UpstreamClient};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// Shared gateway state: the Config Store (C1), the Rate Limiter (C2), the
/// Log Buffer (C3) and the proxy's upstream client, composed into one
/// cheaply-cloneable handle passed to every request.
///
/// Routes are immutable after load: `routes` is an `ArcSwap<RouteTable>` so
/// reads never take a lock. Keys are mutable through the admin surface:
/// `keys` is a `DashMap` keyed by `ApiKey.key`, following the same
/// per-identity-cell discipline as the rate limiter.
#[derive(Clone)]
pub struct GatewayState {
    routes: Arc<ArcSwap<RouteTable>>,
    keys: Arc<DashMap<String, ApiKey>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub logs: Arc<LogBuffer>,
    pub upstream_client: UpstreamClient,
    pub upstream_timeout: Duration,
    pub metrics: Metrics,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> Self {
        let route_table = RouteTable::new(&config.routes);
        let keys = DashMap::new();
        for key in &config.keys {
            keys.insert(key.key.clone(), key.clone());
        }

        metrics::gauge!("gateway_config_routes_total").set(config.routes.len() as f64);
        metrics::gauge!("gateway_config_keys_total").set(config.keys.len() as f64);

        Self {
            routes: Arc::new(ArcSwap::new(Arc::new(route_table))),
            keys: Arc::new(keys),
            rate_limiter: Arc::new(RateLimiter::new()),
            logs: Arc::new(LogBuffer::new(config.log_buffer_capacity)),
            upstream_client: upstream::build_client(),
            upstream_timeout: Duration::from_millis(config.upstream_timeout_ms),
            metrics: Metrics::install(),
        }
    }

    /// Longest-prefix route resolution (§4.4). Returns an owned clone so
    /// callers never hold the `ArcSwap` guard across an `.await` point.
    pub fn match_route(&self, path: &str) -> Option<CompiledRoute> {
        self.routes.load().match_route(path).cloned()
    }

    pub fn list_routes(&self) -> Vec<CompiledRoute> {
        self.routes.load().all().to_vec()
    }

    pub fn get_key(&self, key: &str) -> Option<ApiKey> {
        self.keys.get(key).map(|e| e.clone())
    }

    pub fn list_keys(&self) -> Vec<ApiKey> {
        self.keys.iter().map(|e| e.value().clone()).collect()
    }

    /// Upsert the rate-limit policy for an existing key. Absent `policy`
    /// makes the key unlimited. Invalidates any cached `RateWindow` so the
    /// next rate-check for this key observes a fresh window under the new
    /// policy, per §4.1's invalidation requirement.
    pub fn set_policy(&self, key: &str, policy: Option<RateLimitPolicy>) -> Result<(), GatewayError> {
        let mut entry = self.keys.get_mut(key).ok_or(GatewayError::UnknownKey)?;
        entry.rate_limit = policy;
        drop(entry);
        self.rate_limiter.invalidate(key);
        Ok(())
    }
}
