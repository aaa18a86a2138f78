use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use super::rate_limit::{RateLimitStore, StoreError};
use crate::cache::models::rate_limit::RateWindow;
use crate::clock::{Clock, SystemClock};

/// Expired windows of keys that are never read again are dropped at most this often.
const SWEEP_INTERVAL_MICROS: i64 = 60 * 1_000_000;

/// Process-local window store with TTL eviction.
///
/// A read evicts its own expired key; writes periodically sweep every expired
/// key so one-off clients do not accumulate. Shared by all tasks of one
/// process only; use Redis when several processes serve the same clients.
pub struct InMemoryRateLimitStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    last_sweep_micros: AtomicI64,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    window: RateWindow,
    expires_at: f64,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let started = to_micros(clock.now());
        Self {
            entries: DashMap::new(),
            clock,
            last_sweep_micros: AtomicI64::new(started),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn sweep_if_due(&self, now: f64) {
        let now_micros = to_micros(now);
        let last = self.last_sweep_micros.load(Ordering::Relaxed);
        if now_micros - last < SWEEP_INTERVAL_MICROS {
            return;
        }
        // one writer sweeps, the others carry on
        if self
            .last_sweep_micros
            .compare_exchange(last, now_micros, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let before = self.entries.len();
        self.entries.retain(|_, entry| now <= entry.expires_at);
        tracing::debug!(
            evicted = before.saturating_sub(self.entries.len()),
            "swept expired rate limit windows"
        );
    }
}

fn to_micros(secs: f64) -> i64 {
    (secs * 1_000_000.0) as i64
}

impl Default for InMemoryRateLimitStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, key: &str) -> Result<Option<RateWindow>, StoreError> {
        let now = self.clock.now();
        self.entries.remove_if(key, |_, entry| now > entry.expires_at);

        Ok(self.entries.get(key).map(|entry| entry.window))
    }

    async fn set(&self, key: &str, window: &RateWindow, ttl: Duration) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.sweep_if_due(now);

        let expires_at = now + ttl.as_secs_f64();
        self.entries.insert(
            key.to_string(),
            Entry {
                window: *window,
                expires_at,
            },
        );

        Ok(())
    }
}
