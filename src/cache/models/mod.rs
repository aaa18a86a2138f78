/// Records kept in the shared cache.
pub mod rate_limit;

pub use rate_limit::RateWindow;
