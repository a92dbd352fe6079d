//! Rate limit policies.
//!
//! A policy is pure configuration: the window length, the request ceiling,
//! the denial message, and the reconciliation flags. The named constructors
//! cover the common cases (authentication, general API traffic, sensitive
//! actions) with fixed parameters.

use std::time::Duration;

use crate::error::{Result, TurnstileError};

/// Default window length when none is configured.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);
/// Default request ceiling when none is configured.
pub const DEFAULT_MAX_REQUESTS: u64 = 100;
/// Default message returned on denial.
pub const DEFAULT_MESSAGE: &str = "Too many requests, please try again later.";

/// Configuration for a single rate limit.
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    /// Length of the counting window
    pub window: Duration,
    /// Requests allowed per window per key; zero denies every request
    pub max_requests: u64,
    /// Body text returned to the caller on denial
    pub message: String,
    /// Refund the charge when the response status is in [200, 400)
    pub skip_successful_requests: bool,
    /// Refund the charge when the response status is >= 400
    pub skip_failed_requests: bool,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_REQUESTS)
    }
}

impl RateLimitPolicy {
    /// Create a policy with the given window and ceiling.
    pub fn new(window: Duration, max_requests: u64) -> Self {
        Self {
            window,
            max_requests,
            message: DEFAULT_MESSAGE.to_string(),
            skip_successful_requests: false,
            skip_failed_requests: false,
        }
    }

    /// Replace the denial message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Refund requests that complete with a 2xx/3xx status.
    pub fn skip_successful_requests(mut self) -> Self {
        self.skip_successful_requests = true;
        self
    }

    /// Refund requests that complete with a 4xx/5xx status.
    pub fn skip_failed_requests(mut self) -> Self {
        self.skip_failed_requests = true;
        self
    }

    /// Validate the policy.
    ///
    /// A zero-length window can never roll over and is rejected here, at
    /// construction time, rather than surfacing as odd behavior per request.
    /// A ceiling of zero is valid and means every request is denied.
    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(TurnstileError::Config(
                "rate limit window must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Policy for authentication endpoints: 5 attempts per 15 minutes,
    /// successful attempts are not counted.
    pub fn auth() -> Self {
        Self::new(Duration::from_secs(15 * 60), 5)
            .with_message("Too many authentication attempts, please try again later.")
            .skip_successful_requests()
    }

    /// Policy for general API traffic: 100 requests per minute.
    pub fn api() -> Self {
        Self::new(Duration::from_secs(60), 100)
    }

    /// Policy for sensitive actions: 3 requests per hour.
    pub fn sensitive() -> Self {
        Self::new(Duration::from_secs(60 * 60), 3)
            .with_message("Too many attempts for this action, please try again later.")
    }
}
