pub mod types;

#[cfg(test)]
mod tests;

pub use types::*;

use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;

impl GatewayConfig {
    /// Load configuration from a file and apply environment variable overrides.
    /// When the file does not exist, built-in defaults are used — an empty
    /// route table and key set, suitable only for smoke-testing the binary.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config: GatewayConfig = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            match path.extension().and_then(|e| e.to_str()) {
                Some("toml") => toml::from_str(&content)?,
                Some("json") => serde_json::from_str(&content)?,
                Some(ext) => anyhow::bail!("unsupported config format: .{ext}, use .toml or .json"),
                None => anyhow::bail!("config file has no extension, use .toml or .json"),
            }
        } else {
            tracing::info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            GatewayConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            "loaded gateway configuration, routes={}, keys={}",
            config.routes.len(),
            config.keys.len()
        );
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            self.listen = v;
        }
        if let Ok(v) = std::env::var("GATEWAY_UPSTREAM_TIMEOUT_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.upstream_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("GATEWAY_LOG_BUFFER_CAPACITY") {
            if let Ok(n) = v.parse::<usize>() {
                self.log_buffer_capacity = n;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_buffer_capacity == 0 {
            anyhow::bail!("log_buffer_capacity must be greater than zero");
        }
        if self.upstream_timeout_ms == 0 {
            anyhow::bail!("upstream_timeout_ms must be greater than zero");
        }

        let mut seen_prefixes = HashSet::new();
        for route in &self.routes {
            if !route.path_prefix.starts_with('/') {
                anyhow::bail!(
                    "route path_prefix must begin with '/': {}",
                    route.path_prefix
                );
            }
            if route.path_prefix.starts_with("/admin") {
                anyhow::bail!(
                    "route path_prefix '{}' collides with the reserved /admin namespace",
                    route.path_prefix
                );
            }
            if route.target_url.parse::<http::Uri>().is_err() {
                anyhow::bail!("route target_url is not a valid URL: {}", route.target_url);
            }
            if !seen_prefixes.insert(route.path_prefix.clone()) {
                anyhow::bail!(
                    "duplicate (or equal-length colliding) route path_prefix: {}",
                    route.path_prefix
                );
            }
        }

        let mut seen_keys = HashSet::new();
        for key in &self.keys {
            if key.key.is_empty() {
                anyhow::bail!("api key must be non-empty");
            }
            if !seen_keys.insert(key.key.clone()) {
                anyhow::bail!("duplicate api key: {}", key.key);
            }
            if let Some(policy) = key.rate_limit {
                if policy.interval_ms == 0 {
                    anyhow::bail!("rate_limit.interval_ms must be greater than zero, key={}", key.key);
                }
            }
        }

        Ok(())
    }
}
