mod auth;
pub mod client_ip;
mod error_handler;
pub mod rate_limit;

pub use auth::{AuthUser, auth_middleware};
pub use client_ip::resolve_client_key;
pub use error_handler::log_errors;
pub use rate_limit::{Decision, RateLimiter, evaluate, rate_limit};
