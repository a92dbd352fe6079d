//! Turnstile - In-process HTTP Rate Limiting Middleware
//!
//! This crate implements fixed-window rate limiting for axum services:
//! per-(client, route) counters, the `X-RateLimit-*` response-header
//! contract, outcome-based reconciliation of charged requests, and
//! introspection/reset operations. Counters live in process memory, so a
//! horizontally scaled deployment enforces its ceiling per instance; the
//! `ratelimit::RateLimitBackend` trait is the seam for an external store.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
