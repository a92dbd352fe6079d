//! Client identity resolution.
//!
//! Produces a best-effort identifier for the client behind a request,
//! preferring proxy-set headers over the raw socket address. The first
//! `x-forwarded-for` hop is trusted as-is: a client not behind a trusted
//! proxy can set the header itself, so this does not defend against IP
//! spoofing.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Identity assigned when no client address can be resolved.
///
/// All unresolvable clients share this single bucket; the limiter fails
/// open rather than rejecting requests it cannot attribute.
pub const FALLBACK_IDENTITY: &str = "127.0.0.1";

/// Resolve the client identity for a request. Never fails.
///
/// Resolution order, first match wins:
/// 1. first comma-separated token of `x-forwarded-for`, trimmed
/// 2. `x-real-ip`
/// 3. the transport-layer remote address
/// 4. [`FALLBACK_IDENTITY`]
pub fn client_identity(req: &Request) -> String {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next().map(str::trim) {
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("x-real-ip") {
        if let Ok(value) = real_ip.to_str() {
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    FALLBACK_IDENTITY.to_string()
}
