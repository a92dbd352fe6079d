//! Rate limiting middleware.
//!
//! Charges each request before the downstream handler runs, so overlapping
//! requests cannot slip past the ceiling, and reconciles the charge after
//! the response is produced when the policy exempts that outcome. Denials
//! are terminal: a 429 with a structured body and the downstream handler
//! never runs.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header::HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use super::identity::client_identity;
use crate::ratelimit::{Decision, RateLimitBackend};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Machine-readable code distinguishing denials from infrastructure errors.
const DENIAL_CODE: &str = "RATE_LIMIT_EXCEEDED";

/// Denial body sent with every 429.
#[derive(Debug, Serialize)]
struct DenialBody {
    success: bool,
    error: String,
    code: &'static str,
    #[serde(rename = "retryAfter")]
    retry_after: u64,
}

/// Enforce a rate limit around the downstream handler.
///
/// Wire it up with `axum::middleware::from_fn` and a cloned backend:
///
/// ```ignore
/// let limiter: Arc<dyn RateLimitBackend> = Arc::new(RateLimiter::new(policy)?);
/// let app = Router::new()
///     .route("/api/ping", get(ping))
///     .layer(middleware::from_fn(move |req, next| {
///         rate_limit(limiter.clone(), req, next)
///     }));
/// ```
///
/// This middleware never fails; errors from the downstream handler
/// propagate untouched and leave the charge in place.
pub async fn rate_limit(
    limiter: Arc<dyn RateLimitBackend>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(&req);
    let path = req.uri().path().to_string();

    match limiter.check_and_charge(&identity, &path).await {
        Decision::Denied {
            limit,
            retry_after_secs,
            message,
        } => {
            warn!(identity = %identity, path = %path, "Request rate limited");
            denial_response(limit, retry_after_secs, message)
        }
        Decision::Allowed {
            limit,
            remaining,
            reset_secs,
        } => {
            let mut response = next.run(req).await;
            set_rate_limit_headers(&mut response, limit, remaining, reset_secs);
            limiter
                .reconcile(&identity, &path, response.status().as_u16())
                .await;
            response
        }
    }
}

fn denial_response(limit: u64, retry_after_secs: u64, message: String) -> Response {
    let body = DenialBody {
        success: false,
        error: message,
        code: DENIAL_CODE,
        retry_after: retry_after_secs,
    };
    let mut response = (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response();
    set_rate_limit_headers(&mut response, limit, 0, retry_after_secs);
    response
}

fn set_rate_limit_headers(response: &mut Response, limit: u64, remaining: u64, reset_secs: u64) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(reset_secs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{RateLimitPolicy, RateLimiter};
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(policy: RateLimitPolicy) -> Router {
        let limiter: Arc<dyn RateLimitBackend> = Arc::new(RateLimiter::new(policy).unwrap());
        Router::new()
            .route("/api/ping", get(|| async { "pong" }))
            .route(
                "/api/fail",
                get(|| async { (StatusCode::BAD_REQUEST, "nope") }),
            )
            .layer(axum::middleware::from_fn(move |req, next| {
                rate_limit(limiter.clone(), req, next)
            }))
    }

    fn get_request(path: &str, identity: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri(path)
            .header("x-forwarded-for", identity)
            .body(Body::empty())
            .unwrap()
    }

    fn header(response: &Response, name: &str) -> u64 {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap()
    }

    #[tokio::test]
    async fn test_allowed_response_carries_headers() {
        let app = app(RateLimitPolicy::new(Duration::from_secs(60), 2));

        let response = app
            .oneshot(get_request("/api/ping", "192.168.1.1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "x-ratelimit-limit"), 2);
        assert_eq!(header(&response, "x-ratelimit-remaining"), 1);
        assert_eq!(header(&response, "x-ratelimit-reset"), 60);
    }

    #[tokio::test]
    async fn test_third_request_denied_with_structured_body() {
        let app = app(RateLimitPolicy::new(Duration::from_secs(60), 2));

        let first = app
            .clone()
            .oneshot(get_request("/api/ping", "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(header(&first, "x-ratelimit-remaining"), 1);

        let second = app
            .clone()
            .oneshot(get_request("/api/ping", "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(header(&second, "x-ratelimit-remaining"), 0);

        let third = app
            .oneshot(get_request("/api/ping", "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&third, "x-ratelimit-remaining"), 0);

        let body = third.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(json["error"], "Too many requests, please try again later.");
        let retry_after = json["retryAfter"].as_u64().unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
    }

    #[tokio::test]
    async fn test_zero_ceiling_denies_immediately() {
        let app = app(RateLimitPolicy::new(Duration::from_secs(60), 0));

        let response = app
            .oneshot(get_request("/api/ping", "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&response, "x-ratelimit-limit"), 0);
    }

    #[tokio::test]
    async fn test_identities_do_not_interfere() {
        let app = app(RateLimitPolicy::new(Duration::from_secs(60), 1));

        let first = app
            .clone()
            .oneshot(get_request("/api/ping", "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let other = app
            .clone()
            .oneshot(get_request("/api/ping", "2.2.2.2"))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::OK);

        let exhausted = app
            .oneshot(get_request("/api/ping", "1.1.1.1"))
            .await
            .unwrap();
        assert_eq!(exhausted.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_skip_successful_requests_refunds() {
        let policy =
            RateLimitPolicy::new(Duration::from_secs(60), 1).skip_successful_requests();
        let app = app(policy);

        // Successful traffic is refunded and never exhausts the ceiling
        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(get_request("/api/ping", "192.168.1.1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_skip_successful_still_counts_failures() {
        let policy =
            RateLimitPolicy::new(Duration::from_secs(60), 1).skip_successful_requests();
        let app = app(policy);

        let failed = app
            .clone()
            .oneshot(get_request("/api/fail", "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(failed.status(), StatusCode::BAD_REQUEST);

        let denied = app
            .oneshot(get_request("/api/fail", "192.168.1.1"))
            .await
            .unwrap();
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_skip_failed_requests_refunds() {
        let policy = RateLimitPolicy::new(Duration::from_secs(60), 1).skip_failed_requests();
        let app = app(policy);

        for _ in 0..4 {
            let response = app
                .clone()
                .oneshot(get_request("/api/fail", "192.168.1.1"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
