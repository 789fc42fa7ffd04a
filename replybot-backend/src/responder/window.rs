use chrono::{DateTime, Duration, Utc};

/// Timestamp format the mentions endpoint expects for `start_time`
pub const PLATFORM_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Start of the lookback window ending at `now`, formatted for the platform.
/// A lookback reaching past the representable range starts at the Unix epoch.
pub fn window_start(now: DateTime<Utc>, lookback_minutes: i64) -> String {
    Duration::try_minutes(lookback_minutes)
        .and_then(|lookback| now.checked_sub_signed(lookback))
        .unwrap_or(DateTime::UNIX_EPOCH)
        .format(PLATFORM_TIME_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_start_default_lookback() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 10, 30).unwrap();
        assert_eq!(window_start(now, 20), "2024-05-01T11:50:30Z");
    }

    #[test]
    fn test_window_start_drops_subseconds_and_crosses_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap() + Duration::milliseconds(750);
        assert_eq!(window_start(now, 20), "2023-12-31T23:45:00Z");
    }

    #[test]
    fn test_window_start_huge_lookback_does_not_overflow() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(window_start(now, 1_000_000_000_000), "1970-01-01T00:00:00Z");
        assert_eq!(window_start(now, i64::MAX), "1970-01-01T00:00:00Z");
    }
}
