use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Histogram bucket boundaries for latency metrics (seconds).
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Thin handle around the global metrics recorder.
///
/// After `Metrics::install()` the `metrics` crate macros (`counter!`, `gauge!`,
/// `histogram!`) can be used anywhere in the codebase. The `PrometheusHandle`
/// is retained solely for rendering the `/admin/metrics` endpoint.
#[derive(Clone)]
pub struct Metrics {
    handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and register metric descriptions.
    ///
    /// Idempotent: the global recorder can only be installed once per process,
    /// so the first call does the installing and every later call (repeated
    /// `GatewayState::new` in tests, config reloads) just reuses the cached
    /// handle instead of panicking on the second `install_recorder`.
    pub fn install() -> Self {
        let handle = HANDLE.get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .set_buckets_for_metric(
                    metrics_exporter_prometheus::Matcher::Suffix("_duration_seconds".to_string()),
                    LATENCY_BUCKETS,
                )
                .expect("valid matcher")
                .install_recorder()
                .expect("failed to install metrics recorder");

            describe_counter!(
                "gateway_requests_total",
                Unit::Count,
                "Total requests handled by the gateway pipeline, by method and status code"
            );
            describe_histogram!(
                "gateway_request_duration_seconds",
                Unit::Seconds,
                "End-to-end request duration as observed by the gateway"
            );

            describe_counter!(
                "gateway_rate_limit_rejected_total",
                Unit::Count,
                "Total requests rejected by the rate limiter"
            );

            describe_gauge!(
                "gateway_connections_active",
                Unit::Count,
                "Number of active downstream connections"
            );
            describe_counter!(
                "gateway_connections_total",
                Unit::Count,
                "Total downstream connections accepted"
            );

            describe_gauge!(
                "gateway_config_routes_total",
                Unit::Count,
                "Number of routes currently loaded"
            );
            describe_gauge!(
                "gateway_config_keys_total",
                Unit::Count,
                "Number of API keys currently registered"
            );

            handle
        });

        Self {
            handle: handle.clone(),
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
