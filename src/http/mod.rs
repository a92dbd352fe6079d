//! HTTP surface: middleware, identity resolution, and admin endpoints.

mod admin;
mod identity;
mod middleware;

pub use admin::admin_router;
pub use identity::{client_identity, FALLBACK_IDENTITY};
pub use middleware::rate_limit;
