//! Parse a `Retry-After` header value into a millisecond delay.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Case-insensitive header lookup abstraction so callers can hand in
/// whatever map type their HTTP client surfaces.
pub fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Parse `Retry-After` per RFC 9110 §10.2.3: either an integer number of
/// seconds, or an HTTP-date. Returns `None` if absent or unparseable.
pub fn parse_retry_after(headers: &HashMap<String, String>, now: DateTime<Utc>) -> Option<u64> {
    let raw = find_header(headers, "Retry-After")?.trim();

    if let Ok(seconds) = raw.parse::<i64>() {
        return Some((seconds.max(0) as u64) * 1000);
    }

    parse_http_date(raw).map(|parsed| {
        let delta = parsed - now;
        delta.num_milliseconds().max(0) as u64
    })
}

/// Try RFC 7231, RFC 850, and ANSI C asctime formats in order.
fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    // RFC 7231: "Sun, 06 Nov 1994 08:49:37 GMT"
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // RFC 850: "Sunday, 06-Nov-94 08:49:37 GMT"
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%A, %d-%b-%y %H:%M:%S GMT") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    // ANSI C asctime: "Sun Nov  6 08:49:37 1994"
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%a %b %e %H:%M:%S %Y") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn absent_header_yields_none() {
        let h = headers(&[]);
        assert_eq!(parse_retry_after(&h, Utc::now()), None);
    }

    #[test]
    fn integer_seconds_converted_to_ms() {
        let h = headers(&[("Retry-After", "5")]);
        assert_eq!(parse_retry_after(&h, Utc::now()), Some(5000));
    }

    #[test]
    fn case_insensitive_header_lookup() {
        let h = headers(&[("retry-after", "2")]);
        assert_eq!(parse_retry_after(&h, Utc::now()), Some(2000));
    }

    #[test]
    fn negative_seconds_clamped_to_zero() {
        let h = headers(&[("Retry-After", "-5")]);
        assert_eq!(parse_retry_after(&h, Utc::now()), Some(0));
    }

    #[test]
    fn rfc7231_http_date_parsed() {
        let now = Utc::now();
        let future = now + ChronoDuration::seconds(10);
        let formatted = future.to_rfc2822();
        let h = headers(&[("Retry-After", &formatted)]);
        let ms = parse_retry_after(&h, now).unwrap();
        assert!((9000..=10500).contains(&ms), "ms={ms}");
    }

    #[test]
    fn unparseable_value_yields_none() {
        let h = headers(&[("Retry-After", "not-a-date")]);
        assert_eq!(parse_retry_after(&h, Utc::now()), None);
    }
}
