/// Backing stores for rate-limit windows.
pub mod memory;
pub mod rate_limit;

pub use memory::InMemoryRateLimitStore;
pub use rate_limit::{RateLimitStore, RedisRateLimitStore, StoreError};
