use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    cache::{RateLimitStore, RateWindow, StoreError, keys::rate_limit_key},
    clock::{Clock, SystemClock},
    config::RateLimitConfig,
    middleware::client_ip::resolve_client_key,
};

pub const RATE_LIMIT_EXCEEDED: &str = "Rate limit exceeded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    Deny { retry_after_seconds: u64 },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

/// Outcome of applying one request to a client's window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub decision: Decision,
    /// The window after counting this request.
    pub window: RateWindow,
}

/// Fixed-window counting step.
///
/// A window rolls over only once `time_window_seconds` is strictly exceeded,
/// and the request that takes `count` past `request_limit` is the first one
/// denied.
pub fn evaluate(existing: Option<RateWindow>, now: f64, config: &RateLimitConfig) -> Evaluation {
    let current = existing.unwrap_or_else(|| RateWindow::empty(now));

    if current.is_expired(now, config.time_window_seconds) {
        return Evaluation {
            decision: Decision::Admit,
            window: RateWindow::fresh(now),
        };
    }

    let window = RateWindow {
        count: current.count.saturating_add(1),
        ..current
    };

    if window.count > config.request_limit {
        let remaining = config.time_window_seconds as f64 - window.elapsed(now);
        // clock skew can push it outside the window; the cast truncates toward zero
        let retry_after_seconds =
            remaining.clamp(0.0, config.time_window_seconds as f64) as u64;

        return Evaluation {
            decision: Decision::Deny {
                retry_after_seconds,
            },
            window,
        };
    }

    Evaluation {
        decision: Decision::Admit,
        window,
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn RateLimitStore>, config: RateLimitConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn RateLimitStore>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Counts one request from `client_key` and decides whether it may proceed.
    ///
    /// One read and, on admission, one write against the store. Denied
    /// requests are not written back. Store failures never escape: they are
    /// resolved by the configured fail-open policy.
    pub async fn admit(&self, client_key: &str) -> Decision {
        let key = rate_limit_key(client_key);
        let now = self.clock.now();

        let existing = match self.store.get(&key).await {
            Ok(existing) => existing,
            Err(e) => return self.on_store_failure(client_key, &e),
        };

        let Evaluation { decision, window } = evaluate(existing, now, &self.config);

        match decision {
            Decision::Admit => {
                if let Err(e) = self.store.set(&key, &window, self.config.time_window()).await {
                    return self.on_store_failure(client_key, &e);
                }
            }
            Decision::Deny {
                retry_after_seconds,
            } => {
                tracing::info!(
                    client = client_key,
                    count = window.count,
                    retry_after = retry_after_seconds,
                    "rate limit exceeded"
                );
            }
        }

        decision
    }

    fn on_store_failure(&self, client_key: &str, error: &StoreError) -> Decision {
        if self.config.fail_open {
            tracing::warn!(
                client = client_key,
                error = %error,
                "rate limit store unavailable, admitting request"
            );
            Decision::Admit
        } else {
            tracing::error!(
                client = client_key,
                error = %error,
                "rate limit store unavailable, rejecting request"
            );
            Decision::Deny {
                retry_after_seconds: self.config.time_window_seconds,
            }
        }
    }

    pub async fn check_rate_limit(self: Arc<Self>, req: Request<Body>, next: Next) -> Response {
        let peer = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let client_key = resolve_client_key(req.headers(), peer);
        tracing::debug!(client = %client_key, "resolved rate limit key");

        match self.admit(&client_key).await {
            Decision::Admit => next.run(req).await,
            Decision::Deny {
                retry_after_seconds,
            } => too_many_requests(retry_after_seconds),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RateLimitExceeded {
    pub error: &'static str,
    pub retry_after: u64,
}

pub fn too_many_requests(retry_after: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RateLimitExceeded {
            error: RATE_LIMIT_EXCEEDED,
            retry_after,
        }),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    limiter.check_rate_limit(req, next).await
}
