use crate::config::RateLimitPolicy;
use crate::error::GatewayError;
use dashmap::DashMap;

/// Per-key accounting cell for the fixed-window counter.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    window_start_ms: u64,
    count: u64,
}

/// Per-key fixed-window rate limiter.
///
/// Keyed by `ApiKey.key`, following the gateway's general discipline of a
/// concurrent map holding one lock-protected cell per identity rather than one
/// lock guarding the whole limiter — unrelated keys never contend with each
/// other. The shard lock `DashMap::entry` takes already serializes access to a
/// given key; an inner `Mutex` would only ever be acquired uncontended, so
/// admission mutates the cell directly through the `entry` guard instead of
/// wrapping it in one.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject a single request for `key` under `policy`, observed at
    /// wall-clock `now_ms`. Returns `Ok(())` on admission, or `RateLimited`
    /// with the retry-after bound on rejection. A key with no policy is
    /// unlimited and never touches a window cell.
    pub async fn check(
        &self,
        key: &str,
        policy: Option<RateLimitPolicy>,
        now_ms: u64,
    ) -> Result<(), GatewayError> {
        let Some(policy) = policy else {
            return Ok(());
        };

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| RateWindow {
                window_start_ms: now_ms,
                count: 0,
            });

        if now_ms >= window.window_start_ms + policy.interval_ms {
            window.window_start_ms = now_ms;
            window.count = 0;
        }

        if window.count < policy.limit {
            window.count += 1;
            Ok(())
        } else {
            let retry_after_ms = (window.window_start_ms + policy.interval_ms)
                .saturating_sub(now_ms)
                .max(1);
            Err(GatewayError::RateLimited { retry_after_ms })
        }
    }

    /// Drop the cached window for `key`, so the next `check` for it starts a
    /// fresh window under whatever policy is then in effect. Called by the
    /// Config Store whenever a key's policy is mutated.
    pub fn invalidate(&self, key: &str) {
        self.windows.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(interval_ms: u64, limit: u64) -> RateLimitPolicy {
        RateLimitPolicy { interval_ms, limit }
    }

    #[tokio::test]
    async fn admits_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new();
        let p = policy(1000, 2);

        assert!(limiter.check("k1", Some(p), 0).await.is_ok());
        assert!(limiter.check("k1", Some(p), 10).await.is_ok());
        let err = limiter.check("k1", Some(p), 20).await.unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn window_resets_after_interval_elapses() {
        let limiter = RateLimiter::new();
        let p = policy(1000, 1);

        assert!(limiter.check("k1", Some(p), 0).await.is_ok());
        assert!(limiter.check("k1", Some(p), 500).await.is_err());
        assert!(limiter.check("k1", Some(p), 1000).await.is_ok());
    }

    #[tokio::test]
    async fn unlimited_key_always_admits() {
        let limiter = RateLimiter::new();
        for t in 0..100 {
            assert!(limiter.check("k1", None, t).await.is_ok());
        }
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new();
        let p = policy(1000, 1);

        assert!(limiter.check("a", Some(p), 0).await.is_ok());
        assert!(limiter.check("a", Some(p), 1).await.is_err());
        assert!(limiter.check("b", Some(p), 1).await.is_ok());
    }

    #[tokio::test]
    async fn zero_limit_rejects_every_request() {
        let limiter = RateLimiter::new();
        let p = policy(1000, 0);
        assert!(limiter.check("k1", Some(p), 0).await.is_err());
    }

    #[tokio::test]
    async fn invalidate_forces_fresh_window() {
        let limiter = RateLimiter::new();
        let p = policy(1000, 1);

        assert!(limiter.check("k1", Some(p), 0).await.is_ok());
        assert!(limiter.check("k1", Some(p), 1).await.is_err());

        limiter.invalidate("k1");

        assert!(limiter.check("k1", Some(p), 2).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_admission_never_exceeds_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let p = policy(1000, 10);

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(
                async move { limiter.check("shared", Some(p), 0).await.is_ok() },
            ));
        }

        let mut admitted = 0;
        for h in handles {
            if h.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }

    #[tokio::test]
    async fn retry_after_is_at_least_one_ms() {
        let limiter = RateLimiter::new();
        let p = policy(1000, 1);

        assert!(limiter.check("k1", Some(p), 0).await.is_ok());
        let err = limiter.check("k1", Some(p), 999).await.unwrap_err();
        match err {
            GatewayError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, 1),
            _ => panic!("expected RateLimited"),
        }
    }
}
