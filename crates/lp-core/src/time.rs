//! Minimal UTC time helpers (no chrono dependency).
//!
//! Timestamps are carried as Unix seconds everywhere; formatting uses
//! Howard Hinnant's civil_from_days algorithm for the date part.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current UTC time as Unix seconds. This is the only ambient clock read;
/// the engines all take `now` as a parameter.
pub fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Format Unix seconds as an ISO-8601 UTC string for API display fields.
pub fn unix_to_iso8601(secs: u64) -> String {
    let (y, m, d) = civil_from_days((secs / 86400) as i64);
    let tod = secs % 86400;
    format!(
        "{y:04}-{m:02}-{d:02}T{:02}:{:02}:{:02}Z",
        tod / 3600,
        (tod % 3600) / 60,
        tod % 60
    )
}

/// Hinnant's civil_from_days: days since the Unix epoch → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch() {
        assert_eq!(unix_to_iso8601(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_leap_day() {
        // 2024-02-29T12:00:00Z
        assert_eq!(unix_to_iso8601(1709208000), "2024-02-29T12:00:00Z");
    }

    #[test]
    fn test_end_of_year() {
        // 2025-12-31T23:59:59Z
        assert_eq!(unix_to_iso8601(1767225599), "2025-12-31T23:59:59Z");
    }

    #[test]
    fn test_now_is_after_2025() {
        assert!(now_unix_secs() > 1_735_689_600);
    }
}
