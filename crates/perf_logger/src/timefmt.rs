//! Text formats for execution times and start instants.
//!
//! Execution times use the TimeSpan constant layout `[d.]hh:mm:ss[.fffffff]`
//! and start instants are ISO-8601 UTC with a `Z` suffix. Both carry at most
//! 100 ns (one tick) of precision.

use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, TimeZone, Timelike, Utc};

/// Nanoseconds per tick.
pub const NANOS_PER_TICK: u32 = 100;

const FRACTION_DIGITS: usize = 7;
const SECONDS_PER_DAY: u64 = 86_400;

/// Drop sub-tick precision from a duration.
pub fn truncate_duration(duration: Duration) -> Duration {
    let nanos = duration.subsec_nanos() / NANOS_PER_TICK * NANOS_PER_TICK;
    Duration::new(duration.as_secs(), nanos)
}

/// Drop sub-tick precision from an instant.
pub fn truncate_instant(instant: DateTime<Utc>) -> DateTime<Utc> {
    let nanos = instant.nanosecond() / NANOS_PER_TICK * NANOS_PER_TICK;
    instant.with_nanosecond(nanos).unwrap_or(instant)
}

/// Format a duration as `[d.]hh:mm:ss[.fffffff]`.
///
/// ```
/// use std::time::Duration;
/// use perf_logger::timefmt::format_timespan;
///
/// assert_eq!(format_timespan(Duration::from_millis(100)), "00:00:00.1000000");
/// assert_eq!(format_timespan(Duration::from_secs(90_061)), "1.01:01:01");
/// ```
pub fn format_timespan(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let days = total_secs / SECONDS_PER_DAY;
    let hours = (total_secs % SECONDS_PER_DAY) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let ticks = duration.subsec_nanos() / NANOS_PER_TICK;

    let mut output = String::new();
    if days > 0 {
        output.push_str(&format!("{}.", days));
    }
    output.push_str(&format!("{:02}:{:02}:{:02}", hours, minutes, seconds));
    if ticks > 0 {
        output.push_str(&format!(".{:07}", ticks));
    }
    output
}

/// Parse a `[d.]hh:mm:ss[.f..]` string back into a duration.
///
/// Returns `None` for malformed input or out-of-range components.
pub fn parse_timespan(input: &str) -> Option<Duration> {
    let (days, rest) = match (input.find('.'), input.find(':')) {
        (Some(dot), Some(colon)) if dot < colon => (parse_digits(&input[..dot])?, &input[dot + 1..]),
        _ => (0, input),
    };

    let (clock, fraction) = match rest.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (rest, None),
    };

    let mut parts = clock.split(':');
    let hours = parse_component(parts.next()?, 24)?;
    let minutes = parse_component(parts.next()?, 60)?;
    let seconds = parse_component(parts.next()?, 60)?;
    if parts.next().is_some() {
        return None;
    }

    let ticks = match fraction {
        Some(digits) => {
            if digits.len() > FRACTION_DIGITS {
                return None;
            }
            let value = parse_digits(digits)?;
            value * 10u64.pow((FRACTION_DIGITS - digits.len()) as u32)
        }
        None => 0,
    };

    let secs = days
        .checked_mul(SECONDS_PER_DAY)?
        .checked_add(hours * 3600 + minutes * 60 + seconds)?;
    Some(Duration::new(secs, ticks as u32 * NANOS_PER_TICK))
}

fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_component(text: &str, limit: u64) -> Option<u64> {
    if text.len() != 2 {
        return None;
    }
    parse_digits(text).filter(|value| *value < limit)
}

/// Format an instant as ISO-8601 UTC, trimming trailing fraction zeros.
///
/// Years outside 0000-9999 carry an explicit sign (`+10000-01-01T00:00:00Z`).
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    let base = instant.format("%Y-%m-%dT%H:%M:%S").to_string();
    let ticks = (instant.nanosecond() % 1_000_000_000) / NANOS_PER_TICK;
    if ticks == 0 {
        return format!("{}Z", base);
    }
    let fraction = format!("{:07}", ticks);
    format!("{}.{}Z", base, fraction.trim_end_matches('0'))
}

/// Parse any RFC 3339 instant and normalize it to UTC.
///
/// Signed years produced by [`format_instant`] are accepted as well, so every
/// instant this module writes can be read back.
pub fn parse_instant(input: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(input) {
        Ok(instant) => Some(instant.with_timezone(&Utc)),
        Err(_) => parse_signed_year(input),
    }
}

/// `[+-]YYYY[Y..]-MM-DDThh:mm:ss[.f..]Z`
fn parse_signed_year(input: &str) -> Option<DateTime<Utc>> {
    let sign = match input.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let body = input[1..].strip_suffix('Z')?;
    let (year, rest) = body.split_once('-')?;
    if year.len() < 4 {
        return None;
    }
    let year = i32::try_from(parse_digits(year)?).ok()?;

    // 2000 is a leap year, so February 29 survives until the real year is set.
    let naive = NaiveDateTime::parse_from_str(&format!("2000-{}", rest), "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    naive
        .with_year(sign * year)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Serde adapter for `Duration` fields stored as TimeSpan strings.
pub(crate) mod timespan_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timespan(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::parse_timespan(&text)
            .ok_or_else(|| D::Error::custom(format!("invalid execution time '{}'", text)))
    }
}

/// Serde adapter for UTC instants stored with a `Z` suffix.
pub(crate) mod instant_serde {
    use chrono::{DateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_instant(instant))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::parse_instant(&text)
            .map(super::truncate_instant)
            .ok_or_else(|| D::Error::custom(format!("invalid start time '{}'", text)))
    }
}

/// RFC 3339 rendering used in log messages.
pub(crate) fn display_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
