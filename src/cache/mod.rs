//! Shared cache access used by the request pipeline.
//!
//! `models` holds the records kept in the cache, `keys` builds their keys and
//! `operations` talks to the backing store.

pub mod keys;
pub mod models;
pub mod operations;

pub use models::rate_limit::RateWindow;
pub use operations::{InMemoryRateLimitStore, RateLimitStore, RedisRateLimitStore, StoreError};
