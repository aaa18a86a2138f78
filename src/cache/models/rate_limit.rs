use serde::{Deserialize, Serialize};

/// Fixed-window request counter for a single client.
///
/// `window_start` is in fractional seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: f64,
}

impl RateWindow {
    /// A window opened by the request arriving at `now`.
    pub fn fresh(now: f64) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    /// Placeholder used when the client has no window yet.
    pub fn empty(now: f64) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.window_start
    }

    /// The window only rolls over once `window_seconds` is strictly exceeded.
    pub fn is_expired(&self, now: f64, window_seconds: u64) -> bool {
        self.elapsed(now) > window_seconds as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strict() {
        let window = RateWindow::fresh(100.0);

        assert!(!window.is_expired(159.9, 60));
        assert!(!window.is_expired(160.0, 60));
        assert!(window.is_expired(160.001, 60));
    }

    #[test]
    fn serializes_as_plain_json() {
        let window = RateWindow {
            count: 7,
            window_start: 1_700_000_000.5,
        };
        let json = serde_json::to_value(window).unwrap();

        assert_eq!(json["count"], 7);
        assert_eq!(json["window_start"], 1_700_000_000.5);
    }
}
