use super::types::{ApiKey, GatewayConfig, RateLimitPolicy, RouteRule};

fn route(prefix: &str) -> RouteRule {
    RouteRule {
        path_prefix: prefix.to_string(),
        target_url: "https://upstream.example/base".to_string(),
        strip_prefix: true,
    }
}

#[test]
fn validate_accepts_well_formed_config() {
    let mut cfg = GatewayConfig::default();
    cfg.routes.push(route("/api"));
    cfg.keys.push(ApiKey {
        key: "k1".to_string(),
        name: None,
        rate_limit: Some(RateLimitPolicy {
            interval_ms: 1000,
            limit: 5,
        }),
    });
    assert!(cfg.validate().is_ok());
}

#[test]
fn validate_rejects_duplicate_path_prefix() {
    let mut cfg = GatewayConfig::default();
    cfg.routes.push(route("/api"));
    cfg.routes.push(route("/api"));
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_route_shadowing_admin_namespace() {
    let mut cfg = GatewayConfig::default();
    cfg.routes.push(route("/admin/widgets"));
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_malformed_target_url() {
    let mut cfg = GatewayConfig::default();
    cfg.routes.push(RouteRule {
        path_prefix: "/api".to_string(),
        target_url: "\0not a url".to_string(),
        strip_prefix: false,
    });
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_duplicate_keys() {
    let mut cfg = GatewayConfig::default();
    cfg.keys.push(ApiKey {
        key: "k1".to_string(),
        name: None,
        rate_limit: None,
    });
    cfg.keys.push(ApiKey {
        key: "k1".to_string(),
        name: Some("dup".to_string()),
        rate_limit: None,
    });
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_zero_interval_policy() {
    let mut cfg = GatewayConfig::default();
    cfg.keys.push(ApiKey {
        key: "k1".to_string(),
        name: None,
        rate_limit: Some(RateLimitPolicy {
            interval_ms: 0,
            limit: 5,
        }),
    });
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_zero_log_buffer_capacity() {
    let mut cfg = GatewayConfig::default();
    cfg.log_buffer_capacity = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn load_uses_defaults_when_file_missing() {
    let cfg = GatewayConfig::load(std::path::Path::new("/nonexistent/gateway.toml")).unwrap();
    assert!(cfg.routes.is_empty());
    assert!(cfg.keys.is_empty());
    assert_eq!(cfg.listen, "0.0.0.0:8080");
}
