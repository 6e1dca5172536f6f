//! Shared utility functions for traffic dashboard crates.

/// Date utility functions
pub mod dates {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse an observation timestamp.
    ///
    /// Accepts RFC 3339 (`2024-06-01T14:00:00Z`), a naive
    /// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (taken as UTC), or a
    /// bare `YYYY-MM-DD` (midnight UTC).
    pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        parse_naive(s).map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// Parse a wall-clock time, keeping the hour as written.
    ///
    /// An RFC 3339 offset is dropped rather than applied, so
    /// `2024-06-14T14:30:00+02:00` stays 14:30. Naive forms are accepted as
    /// in [`parse_timestamp`].
    pub fn parse_local_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.naive_local());
        }
        parse_naive(s)
    }

    fn parse_naive(s: &str) -> anyhow::Result<NaiveDateTime> {
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(naive);
            }
        }
        let date = parse_date(s)
            .map_err(|_| anyhow::anyhow!("unrecognized timestamp: {:?}", s))?;
        Ok(date.and_time(NaiveTime::MIN))
    }

    /// Midnight UTC at the start of `date`.
    pub fn start_of_day(date: &NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
    }

    /// Midnight UTC at the start of the day after `date`.
    ///
    /// Returns `None` at the end of the representable calendar.
    pub fn start_of_next_day(date: &NaiveDate) -> Option<DateTime<Utc>> {
        date.succ_opt().map(|next| start_of_day(&next))
    }

}

/// Lenient coercion of form values into numbers.
pub mod numbers {
    /// Coerce a form value to an integer.
    ///
    /// Whole numbers parse directly; finite decimals are truncated toward
    /// zero ("14.7" becomes 14). Empty, non-numeric and non-finite input
    /// yields `None`.
    pub fn coerce_int(s: &str) -> Option<i64> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Some(i);
        }
        truncate_float(coerce_float(trimmed)?)
    }

    /// Coerce a form value to a finite float.
    pub fn coerce_float(s: &str) -> Option<f64> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Truncate a finite float toward zero, rejecting values outside `i64`.
    pub fn truncate_float(v: f64) -> Option<i64> {
        if !v.is_finite() {
            return None;
        }
        let t = v.trunc();
        if t < i64::MIN as f64 || t > i64::MAX as f64 {
            return None;
        }
        Some(t as i64)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_coerce_int() {
            assert_eq!(coerce_int("14"), Some(14));
            assert_eq!(coerce_int(" 7 "), Some(7));
            assert_eq!(coerce_int("14.7"), Some(14));
            assert_eq!(coerce_int("-0.5"), Some(0));
            assert_eq!(coerce_int(""), None);
            assert_eq!(coerce_int("noon"), None);
            assert_eq!(coerce_int("NaN"), None);
        }

        #[test]
        fn test_coerce_float() {
            assert_eq!(coerce_float("2.3522"), Some(2.3522));
            assert_eq!(coerce_float("-73"), Some(-73.0));
            assert_eq!(coerce_float("inf"), None);
            assert_eq!(coerce_float("NaN"), None);
            assert_eq!(coerce_float("abc"), None);
        }

        #[test]
        fn test_truncate_float() {
            assert_eq!(truncate_float(23.99), Some(23));
            assert_eq!(truncate_float(f64::NAN), None);
            assert_eq!(truncate_float(1e30), None);
        }
    }
}
