// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use http::HeaderMap;
use http::header::RETRY_AFTER;
use jiff::Timestamp;
use jiff::fmt::rfc2822::DateTimeParser;

/// Parser for HTTP dates such as `Wed, 21 Oct 2015 07:28:00 GMT`.
static HTTP_DATE: DateTimeParser = DateTimeParser::new();

/// A provider's hint about when to try again.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use rebound::RetryAfter;
///
/// assert_eq!(RetryAfter::parse("120"), Some(RetryAfter::Delay(Duration::from_secs(120))));
///
/// let at = RetryAfter::parse("Wed, 21 Oct 2015 07:28:00 GMT").expect("HTTP date");
/// assert_eq!(at.delay_from(SystemTime::now()), Duration::ZERO, "past dates mean no wait");
///
/// assert!(RetryAfter::parse("2015-10-21T07:28:00Z").is_some());
/// assert!(RetryAfter::parse("soon").is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    /// Wait this long.
    Delay(Duration),
    /// Wait until this instant.
    At(SystemTime),
}

impl RetryAfter {
    /// Parses a number of seconds, an HTTP date or an RFC 3339 timestamp.
    ///
    /// HTTP dates may use any of the three forms HTTP allows: IMF-fixdate
    /// (`Sun, 06 Nov 1994 08:49:37 GMT`), RFC 850 (`Sunday, 06-Nov-94 08:49:37 GMT`) and asctime
    /// (`Sun Nov  6 08:49:37 1994`).
    ///
    /// Returns `None` for anything else, including negative numbers.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Self::Delay(Duration::from_secs(seconds)));
        }
        if let Ok(seconds) = value.parse::<f64>() {
            return Duration::try_from_secs_f64(seconds).ok().map(Self::Delay);
        }

        HTTP_DATE
            .parse_timestamp(value)
            .or_else(|_| value.parse::<Timestamp>())
            .ok()
            .or_else(|| HTTP_DATE.parse_timestamp(&obsolete_http_date(value)?).ok())
            .map(|at| Self::At(SystemTime::from(at)))
    }

    /// Reads the `Retry-After` header.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers.get(RETRY_AFTER)?.to_str().ok().and_then(Self::parse)
    }

    /// Returns how long to wait when starting at `now`. Instants in the past yield zero.
    #[must_use]
    pub fn delay_from(&self, now: SystemTime) -> Duration {
        match *self {
            Self::Delay(delay) => delay,
            Self::At(at) => at.duration_since(now).unwrap_or(Duration::ZERO),
        }
    }
}

/// Rewrites an RFC 850 or asctime date as `day month year time GMT`, without the weekday.
fn obsolete_http_date(value: &str) -> Option<String> {
    let fields: Vec<&str> = value.split_ascii_whitespace().collect();
    match fields.as_slice() {
        // Sunday, 06-Nov-94 08:49:37 GMT
        [weekday, date, time, "GMT"] if weekday.ends_with(',') => {
            let [day, month, year] = date.split('-').collect::<Vec<_>>()[..] else {
                return None;
            };
            if year.len() != 2 {
                return None;
            }
            let year: u16 = year.parse().ok()?;
            let year = if year < 50 { 2000 + year } else { 1900 + year };
            Some(format!("{day} {month} {year} {time} GMT"))
        }
        // Sun Nov  6 08:49:37 1994
        [_, month, day, time, year] => Some(format!("{day} {month} {year} {time} GMT")),
        _ => None,
    }
}
