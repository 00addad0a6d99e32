//! Processing window derivation.
//!
//! A scheduled run is keyed by the hour bucket of its deadline *in the
//! league's timezone*: two invocations inside the same local hour share a
//! `window_start_at` and the second one lands on the processing-run unique
//! index and no-ops.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Truncate `now` to the start of its hour in `timezone` (IANA name; UTC
/// when absent or unparseable), returned as a UTC instant.
pub fn processing_window_start(now: DateTime<Utc>, timezone: Option<&str>) -> DateTime<Utc> {
    let tz: Tz = timezone
        .and_then(|name| name.parse().ok())
        .unwrap_or(chrono_tz::UTC);

    let local = now.with_timezone(&tz);
    let truncated = local
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0));

    match truncated {
        Some(t) => t.with_timezone(&Utc),
        // A pathological zone transition at the truncation target; fall back
        // to the UTC hour bucket.
        None => truncate_utc_hour(now),
    }
}

fn truncate_utc_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn utc_truncation_drops_minutes_and_seconds() {
        let now = Utc.with_ymd_and_hms(2024, 10, 2, 15, 37, 21).unwrap();
        let window = processing_window_start(now, None);
        assert_eq!(window, Utc.with_ymd_and_hms(2024, 10, 2, 15, 0, 0).unwrap());
    }

    #[test]
    fn whole_hour_zone_matches_utc_bucket() {
        // New York is a whole-hour offset, so the local-hour bucket lands on
        // the same instant as the UTC bucket.
        let now = Utc.with_ymd_and_hms(2024, 10, 2, 15, 37, 21).unwrap();
        let window = processing_window_start(now, Some("America/New_York"));
        assert_eq!(window, Utc.with_ymd_and_hms(2024, 10, 2, 15, 0, 0).unwrap());
    }

    #[test]
    fn fractional_offset_zone_shifts_the_bucket() {
        // Kathmandu is UTC+5:45: 15:37:21Z is 21:22 local, whose hour starts
        // at 21:00 local = 15:15:00Z.
        let now = Utc.with_ymd_and_hms(2024, 10, 2, 15, 37, 21).unwrap();
        let window = processing_window_start(now, Some("Asia/Kathmandu"));
        assert_eq!(
            window,
            Utc.with_ymd_and_hms(2024, 10, 2, 15, 15, 0).unwrap()
        );
    }

    #[test]
    fn unparseable_zone_falls_back_to_utc() {
        let now = Utc.with_ymd_and_hms(2024, 10, 2, 15, 37, 21).unwrap();
        assert_eq!(
            processing_window_start(now, Some("Not/AZone")),
            processing_window_start(now, None)
        );
    }

    #[test]
    fn same_hour_invocations_share_a_window() {
        let first = Utc.with_ymd_and_hms(2024, 10, 2, 15, 0, 1).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 10, 2, 15, 59, 59).unwrap();
        assert_eq!(
            processing_window_start(first, Some("America/Chicago")),
            processing_window_start(second, Some("America/Chicago")),
        );
    }
}
