//! Backend trait for abstracting over rate limiter implementations.

use async_trait::async_trait;

use super::store::RateLimitStats;

/// Outcome of a rate limit check.
///
/// Both variants carry the configured ceiling and the seconds until the
/// window resets, so the HTTP layer can populate the informational headers
/// on every response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The request is within the limit and has been charged.
    Allowed {
        /// Configured request ceiling
        limit: u64,
        /// Requests left in the window after this charge
        remaining: u64,
        /// Whole seconds until the window resets, rounded up
        reset_secs: u64,
    },
    /// The request exceeds the limit and must not reach the handler.
    Denied {
        /// Configured request ceiling
        limit: u64,
        /// Whole seconds until the caller may retry, rounded up
        retry_after_secs: u64,
        /// Message for the denial body
        message: String,
    },
}

/// Trait for rate limiter implementations.
///
/// The in-process `RateLimiter` is the only implementation here. A
/// deployment scaled across multiple instances enforces its limit per
/// process with the in-memory store; implementing this trait against a
/// shared store with atomic increment-and-expire semantics lifts that
/// limitation without touching the HTTP layer.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    /// Check the limit for a client and path, charging the request if
    /// allowed. Never fails: the outcome is always allow or deny.
    async fn check_and_charge(&self, identity: &str, path: &str) -> Decision;

    /// Reconcile a charged request against its final response status,
    /// refunding the charge if the policy exempts that outcome.
    async fn reconcile(&self, identity: &str, path: &str, status: u16);

    /// Remove counters for a client, either a single path or all of them.
    /// Returns the number of counters removed.
    async fn reset(&self, identity: &str, path: Option<&str>) -> usize;

    /// Aggregate usage statistics. Read-only.
    async fn stats(&self) -> RateLimitStats;
}
