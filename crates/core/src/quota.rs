use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Messages one caller identity may send per window.
pub const DAILY_QUOTA: u64 = 50;

/// Length of one quota window in milliseconds (24 hours).
pub const QUOTA_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// The quota window as a [`Duration`].
#[must_use]
pub fn quota_window() -> Duration {
    Duration::milliseconds(QUOTA_WINDOW_MS)
}

/// Quota state reported back to a caller after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    /// Configured limit for the window.
    pub limit: u64,
    /// Consumptions left in the current window.
    pub remaining: u64,
    /// When the current window ends.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub reset: DateTime<Utc>,
}

/// An epoch-aligned fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow {
    /// Number of whole windows elapsed since the Unix epoch.
    pub index: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Compute the epoch-aligned window containing `now`.
///
/// All instances agree on the boundaries, which is what a shared remote
/// counter needs.
///
/// # Panics
///
/// Panics if `window_ms` is not positive.
#[must_use]
pub fn fixed_window(now: &DateTime<Utc>, window_ms: i64) -> FixedWindow {
    assert!(window_ms > 0, "quota window duration must be greater than 0");
    let now_ms = now.timestamp_millis();
    let index = now_ms.div_euclid(window_ms);
    let start = *now - Duration::milliseconds(now_ms.rem_euclid(window_ms));
    let end = start + Duration::milliseconds(window_ms);
    FixedWindow { index, start, end }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_one_day() {
        assert_eq!(quota_window(), Duration::hours(24));
    }

    #[test]
    fn fixed_window_boundaries() {
        let now = DateTime::parse_from_rfc3339("2024-03-10T15:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let w = fixed_window(&now, QUOTA_WINDOW_MS);
        assert_eq!(w.start.to_rfc3339(), "2024-03-10T00:00:00+00:00");
        assert_eq!(w.end.to_rfc3339(), "2024-03-11T00:00:00+00:00");
        assert_eq!(w.index, now.timestamp_millis() / QUOTA_WINDOW_MS);
    }

    #[test]
    fn fixed_window_start_is_inclusive() {
        let now = DateTime::parse_from_rfc3339("2024-03-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let w = fixed_window(&now, QUOTA_WINDOW_MS);
        assert_eq!(w.start, now);
    }

    #[test]
    fn status_serializes_reset_as_millis() {
        let reset = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let status = QuotaStatus {
            limit: DAILY_QUOTA,
            remaining: 49,
            reset,
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["reset"], 1_700_000_000_123_i64);
        assert_eq!(json["remaining"], 49);
    }
}
