//! Rate limiting logic and state management.

mod backend;
mod limiter;
mod policy;
mod store;

pub use backend::{Decision, RateLimitBackend};
pub use limiter::RateLimiter;
pub use policy::{RateLimitPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_MESSAGE, DEFAULT_WINDOW};
pub use store::{ClientKey, ClientUsage, RateLimitEntry, RateLimitStats, RateLimitStore};
