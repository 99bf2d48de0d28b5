use core::fmt;
use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta, Utc};

use crate::error::{Error, Result};

/// How a date/time value is rendered back to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DateTimeHandling {
    /// Keep whatever form the value was written in (offset included).
    #[default]
    RoundTrip,
    /// Convert to the host's local time and drop the offset.
    Local,
    /// Convert to UTC and write with a `Z` suffix.
    Utc,
    /// Write the wall-clock part only.
    Unspecified,
}

/// Calendar value carried by a date/time element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    Offset(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Elapsed time written as `[-][d.]hh:mm:ss[.f]`.
    Duration(TimeDelta),
}

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const SECONDS_PER_DAY: i64 = 86_400;

fn clock_field(text: &str, max: u32) -> Option<i64> {
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<u32>().ok().filter(|v| *v <= max).map(i64::from)
}

/// `[-]d`, `[-][d.]hh:mm` or `[-][d.]hh:mm:ss[.f]` with up to nine
/// fractional digits.
fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let (days, clock) = match body.split_once(':') {
        None if digits(body) => (body, None),
        None => return None,
        Some((head, rest)) => match head.split_once('.') {
            Some((days, hours)) => (days, Some((hours, rest))),
            None => ("0", Some((head, rest))),
        },
    };
    if !digits(days) {
        return None;
    }
    let days: i64 = days.parse().ok()?;
    let mut seconds = days.checked_mul(SECONDS_PER_DAY)?;
    let mut nanos = 0u32;
    if let Some((hours, rest)) = clock {
        let mut fields = rest.split(':');
        let minutes = fields.next()?;
        let (secs, fraction) = match fields.next() {
            Some(tail) => match tail.split_once('.') {
                Some((secs, fraction)) => (secs, Some(fraction)),
                None => (tail, None),
            },
            None => ("00", None),
        };
        if fields.next().is_some() {
            return None;
        }
        let of_day = clock_field(hours, 23)? * 3600 + clock_field(minutes, 59)? * 60 + clock_field(secs, 59)?;
        seconds = seconds.checked_add(of_day)?;
        if let Some(fraction) = fraction {
            if !digits(fraction) || fraction.len() > 9 {
                return None;
            }
            let padded = format!("{fraction:0<9}");
            nanos = padded.parse().ok()?;
        }
    }
    let delta = TimeDelta::new(seconds, nanos)?;
    Some(if negative { -delta } else { delta })
}

/// Days only when non-zero; the fraction takes seven
/// digits unless the value needs nanosecond precision.
fn render_duration(delta: TimeDelta) -> String {
    let magnitude = delta.abs();
    let total = magnitude.num_seconds();
    let nanos = magnitude.subsec_nanos();
    let (days, rest) = (total / SECONDS_PER_DAY, total % SECONDS_PER_DAY);
    let mut text = String::new();
    if delta < TimeDelta::zero() {
        text.push('-');
    }
    if days > 0 {
        text.push_str(&format!("{days}."));
    }
    text.push_str(&format!("{:02}:{:02}:{:02}", rest / 3600, rest % 3600 / 60, rest % 60));
    if nanos > 0 {
        if nanos % 100 == 0 {
            text.push_str(&format!(".{:07}", nanos / 100));
        } else {
            text.push_str(&format!(".{nanos:09}"));
        }
    }
    text
}

impl DateTimeValue {
    /// Accepts RFC 3339 (with offset), a naive `YYYY-MM-DDTHH:MM:SS[.f]`,
    /// a date `YYYY-MM-DD`, a time `HH:MM[:SS[.f]]`, or failing all of
    /// those a duration `[-][d.]hh:mm:ss[.f]`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Self::Offset(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, NAIVE_FORMAT) {
            return Ok(Self::Naive(dt));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
            return Ok(Self::Naive(dt));
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Ok(Self::Date(d));
        }
        for fmt in ["%H:%M:%S%.f", "%H:%M"] {
            if let Ok(t) = NaiveTime::parse_from_str(text, fmt) {
                return Ok(Self::Time(t));
            }
        }
        if let Some(delta) = parse_duration(text) {
            return Ok(Self::Duration(delta));
        }
        Err(Error::literal("date/time", text))
    }

    pub fn render(&self, handling: DateTimeHandling) -> String {
        match (self, handling) {
            (Self::Offset(dt), DateTimeHandling::RoundTrip) => {
                dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            }
            (Self::Offset(dt), DateTimeHandling::Utc) => {
                dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true)
            }
            (Self::Offset(dt), DateTimeHandling::Local) => {
                dt.with_timezone(&Local).naive_local().format(NAIVE_FORMAT).to_string()
            }
            (Self::Offset(dt), DateTimeHandling::Unspecified) => {
                dt.naive_local().format(NAIVE_FORMAT).to_string()
            }
            (Self::Naive(dt), DateTimeHandling::Utc) => {
                dt.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true)
            }
            (Self::Naive(dt), _) => dt.format(NAIVE_FORMAT).to_string(),
            (Self::Date(d), _) => d.format("%Y-%m-%d").to_string(),
            (Self::Time(t), _) => t.format("%H:%M:%S%.f").to_string(),
            (Self::Duration(d), _) => render_duration(*d),
        }
    }

    /// Instant used for chronological comparison. Offset values are
    /// normalized to UTC; dates compare as midnight.
    fn instant(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Offset(dt) => Some(dt.naive_utc()),
            Self::Naive(dt) => Some(*dt),
            Self::Date(d) => d.and_hms_opt(0, 0, 0),
            Self::Time(_) | Self::Duration(_) => None,
        }
    }

    /// `None` when the two values are not on the same axis (a time of day
    /// against a calendar instant, or a duration against either).
    pub fn chronological_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Time(a), Self::Time(b)) => Some(a.cmp(b)),
            (Self::Duration(a), Self::Duration(b)) => Some(a.cmp(b)),
            _ => Some(self.instant()?.cmp(&other.instant()?)),
        }
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DateTimeHandling::RoundTrip))
    }
}

/// Element class that fixes an array's homogeneous element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Text,
    Character,
    Integer,
    Long,
    Decimal,
    Double,
    Boolean,
    DateTime,
    Null,
    Empty,
    KeyValuePair,
    Object,
    Array,
    Tuple,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Character => "character",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Decimal => "decimal",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::DateTime => "date/time",
            Self::Null => "null",
            Self::Empty => "empty",
            Self::KeyValuePair => "key/value pair",
            Self::Object => "object",
            Self::Array => "array",
            Self::Tuple => "tuple",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn offset_round_trips_with_z() {
        let v = DateTimeValue::parse("2024-01-02T03:04:05Z").unwrap();
        assert!(matches!(v, DateTimeValue::Offset(_)));
        assert_eq!(v.render(DateTimeHandling::RoundTrip), "2024-01-02T03:04:05Z");
    }

    #[test]
    fn offset_converts_to_utc() {
        let v = DateTimeValue::parse("2024-01-02T03:04:05+02:00").unwrap();
        assert_eq!(v.render(DateTimeHandling::Utc), "2024-01-02T01:04:05Z");
        assert_eq!(v.render(DateTimeHandling::Unspecified), "2024-01-02T03:04:05");
    }

    #[test]
    fn date_and_time_only() {
        assert_eq!(DateTimeValue::parse("2024-02-29").unwrap().to_string(), "2024-02-29");
        assert_eq!(DateTimeValue::parse("13:45").unwrap().to_string(), "13:45:00");
        assert!(DateTimeValue::parse("yesterday").is_err());
    }

    #[rstest]
    #[case("1.02:03:04", 93_784, 0, "1.02:03:04")]
    #[case("-00:30:00", -1_800, 0, "-00:30:00")]
    #[case("3", 259_200, 0, "3.00:00:00")]
    #[case("2.10:15", 209_700, 0, "2.10:15:00")]
    #[case("1.00:00:00.5", 86_400, 500_000_000, "1.00:00:00.5000000")]
    #[case("1.00:00:00.000000001", 86_400, 1, "1.00:00:00.000000001")]
    fn durations(#[case] text: &str, #[case] seconds: i64, #[case] nanos: u32, #[case] rendered: &str) {
        let v = DateTimeValue::parse(text).unwrap();
        let DateTimeValue::Duration(delta) = v else { panic!("expected a duration, got {v:?}") };
        let expected = TimeDelta::new(seconds.abs(), nanos).unwrap();
        assert_eq!(delta, if seconds < 0 { -expected } else { expected });
        assert_eq!(v.render(DateTimeHandling::Utc), rendered);
        assert_eq!(DateTimeValue::parse(rendered).unwrap(), v);
    }

    #[rstest]
    #[case("1.24:00:00")]
    #[case("1.02:60")]
    #[case("1.2:03:04")]
    #[case("1.02:03:04:05")]
    #[case("1.02:03:04.")]
    #[case("--1")]
    #[case("1.")]
    fn malformed_durations(#[case] text: &str) {
        assert!(DateTimeValue::parse(text).is_err(), "{text}");
    }

    #[test]
    fn clock_text_prefers_time_of_day() {
        assert!(matches!(DateTimeValue::parse("01:02:03").unwrap(), DateTimeValue::Time(_)));
        assert!(matches!(DateTimeValue::parse("-01:02:03").unwrap(), DateTimeValue::Duration(_)));
    }

    #[test]
    fn durations_compare_with_each_other_only() {
        let short = DateTimeValue::parse("-1.00:00:00").unwrap();
        let long = DateTimeValue::parse("2.00:00:00").unwrap();
        let date = DateTimeValue::parse("2024-01-01").unwrap();
        assert_eq!(short.chronological_cmp(&long), Some(Ordering::Less));
        assert_eq!(long.chronological_cmp(&date), None);
    }

    #[test]
    fn comparison_is_chronological_across_offsets() {
        let a = DateTimeValue::parse("2024-01-02T03:00:00+02:00").unwrap();
        let b = DateTimeValue::parse("2024-01-02T02:00:00Z").unwrap();
        assert_eq!(a.chronological_cmp(&b), Some(Ordering::Less));
    }
}
