use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Json;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::debug;

/// How often idle buckets are swept.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Buckets idle this long have refilled completely and can be dropped.
pub const BUCKET_IDLE_TTL: Duration = Duration::from_secs(300);

/// Simple token-bucket rate limiter keyed by string (IP address).
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    max_tokens: u32,
    refill_rate: f64, // tokens per second
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// Create a rate limiter.
    /// - `max_tokens`: burst capacity
    /// - `per_seconds`: refill one token every N seconds
    pub fn new(max_tokens: u32, per_seconds: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            max_tokens,
            refill_rate: 1.0 / per_seconds,
        }
    }

    /// Check if an action is allowed for the given key. Returns true if allowed.
    pub fn check(&self, key: &str) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.max_tokens as f64,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_rate).min(self.max_tokens as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Remove entries untouched for longer than `older_than`. Returns how many were dropped.
    pub fn cleanup(&self, older_than: Duration) -> usize {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let Some(cutoff) = Instant::now().checked_sub(older_than) else {
            return 0;
        };
        let before = buckets.len();
        buckets.retain(|_, b| b.last_refill > cutoff);
        before - buckets.len()
    }
}

/// Per-IP limiter for the API routes.
/// Burst of 60, refill 1 per second (~60/minute sustained).
pub struct ApiRateLimiters {
    pub api: RateLimiter,
}

impl Default for ApiRateLimiters {
    fn default() -> Self {
        Self {
            api: RateLimiter::new(60, 1.0),
        }
    }
}

/// Periodically drop idle buckets so the map does not grow with every client seen.
pub fn spawn_cleanup(limiters: Arc<ApiRateLimiters>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            ticker.tick().await;
            let dropped = limiters.api.cleanup(BUCKET_IDLE_TTL);
            if dropped > 0 {
                debug!(dropped, "rate limiter buckets swept");
            }
        }
    })
}

/// Extract client IP from request, only trusting proxy headers from loopback.
fn client_ip(req: &Request<Body>) -> String {
    let peer_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip());
    let from_loopback = peer_ip.is_some_and(|ip| ip.is_loopback());

    if from_loopback {
        if let Some(forwarded) = req.headers().get("x-forwarded-for")
            && let Ok(val) = forwarded.to_str()
            && let Some(first) = val.split(',').next()
        {
            return first.trim().to_string();
        }

        if let Some(real_ip) = req.headers().get("x-real-ip")
            && let Ok(val) = real_ip.to_str()
        {
            return val.trim().to_string();
        }
    }

    peer_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware for general API rate limiting.
pub async fn api_rate_limit(req: Request<Body>, next: Next) -> Response {
    if let Some(limiters) = req.extensions().get::<Arc<ApiRateLimiters>>() {
        let ip = client_ip(&req);
        if !limiters.api.check(&ip) {
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "message": "Rate limit exceeded. Please try again later." })),
            )
                .into_response();
        }
    }
    next.run(req).await
}
