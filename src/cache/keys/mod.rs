/// Prefix under which every rate-limit window is stored.
pub const RATE_LIMIT_PREFIX: &str = "rate_limit";

/// Cache key holding the window of one client.
pub fn rate_limit_key(client_key: &str) -> String {
    format!("{}:{}", RATE_LIMIT_PREFIX, client_key)
}
