//! Core rate limiter implementation.

use std::time::Instant;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::backend::{Decision, RateLimitBackend};
use super::policy::RateLimitPolicy;
use super::store::{ClientKey, RateLimitStats, RateLimitStore};
use crate::error::Result;

/// In-process rate limiter enforcing a single policy over a private store.
///
/// Each limiter owns its store, so independent instances never share
/// state. The store is guarded by a mutex and every check runs sweep,
/// lookup, and increment inside one critical section; no two requests can
/// interleave between reading a count and writing the incremented value.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Mutex<RateLimitStore>,
}

impl RateLimiter {
    /// Create a limiter for the given policy.
    ///
    /// Fails fast on an invalid policy rather than misbehaving per request.
    pub fn new(policy: RateLimitPolicy) -> Result<Self> {
        policy.validate()?;
        Ok(Self {
            policy,
            store: Mutex::new(RateLimitStore::new()),
        })
    }

    /// The policy this limiter enforces.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Remove expired entries from the store.
    ///
    /// The check path already sweeps on every call; this exists for the
    /// periodic sweeper task so a future change can take the sweep off the
    /// hot path without a new surface.
    pub fn sweep_expired(&self) -> usize {
        self.store.lock().sweep(Instant::now())
    }

    /// Number of entries currently held.
    pub fn entry_count(&self) -> usize {
        self.store.lock().len()
    }

    /// Remove every entry.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.store.lock().clear();
    }
}

#[async_trait]
impl RateLimitBackend for RateLimiter {
    async fn check_and_charge(&self, identity: &str, path: &str) -> Decision {
        let key = ClientKey::new(identity, path);
        let now = Instant::now();
        let mut store = self.store.lock();

        let swept = store.sweep(now);
        if swept > 0 {
            trace!(swept = swept, "Removed expired rate limit entries");
        }

        let entry = store.entry_or_insert(key.clone(), now + self.policy.window);
        if entry.is_expired(now) {
            entry.roll_window(now + self.policy.window);
        }

        let reset_secs = secs_until(entry.reset_at, now);

        if entry.count >= self.policy.max_requests {
            debug!(key = %key, limit = self.policy.max_requests, "Rate limit exceeded");
            return Decision::Denied {
                limit: self.policy.max_requests,
                retry_after_secs: reset_secs,
                message: self.policy.message.clone(),
            };
        }

        entry.count += 1;
        Decision::Allowed {
            limit: self.policy.max_requests,
            remaining: self.policy.max_requests.saturating_sub(entry.count),
            reset_secs,
        }
    }

    async fn reconcile(&self, identity: &str, path: &str, status: u16) {
        let refund = (self.policy.skip_successful_requests && (200..400).contains(&status))
            || (self.policy.skip_failed_requests && status >= 400);
        if !refund {
            return;
        }

        let key = ClientKey::new(identity, path);
        let mut store = self.store.lock();
        // The entry may have been swept or reset since the charge; a refund
        // with nothing to refund is a no-op.
        if let Some(entry) = store.get_mut(&key) {
            entry.count = entry.count.saturating_sub(1);
            trace!(key = %key, status = status, "Refunded rate limit charge");
        }
    }

    async fn reset(&self, identity: &str, path: Option<&str>) -> usize {
        let removed = self.store.lock().reset_client(identity, path);
        debug!(identity = identity, removed = removed, "Reset rate limit counters");
        removed
    }

    async fn stats(&self) -> RateLimitStats {
        self.store.lock().stats(Instant::now())
    }
}

/// Whole seconds until `reset_at`, rounded up, floored at zero.
fn secs_until(reset_at: Instant, now: Instant) -> u64 {
    let remaining = reset_at.saturating_duration_since(now);
    (remaining.as_millis() as u64).div_ceil(1000)
}
