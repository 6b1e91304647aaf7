//! Permissive date/time parsing backend and canonical ISO-8601 formatting.
//!
//! The detection engine never interprets calendar fields itself; everything
//! funnels through [`parse_instant`], which accepts numeric dates under any
//! common separator, month names, two-digit years, and an optional
//! time-of-day with fractional seconds and UTC offset. Calendar validity is
//! enforced by `chrono`, so a lexically plausible value like `2024-13-40`
//! fails here rather than in the caller.

use std::fmt;
use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use thiserror::Error;

/// Positional meaning of the numeric components of a date string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Order {
    Dmy,
    Mdy,
    Ymd,
}

impl Order {
    pub const ALL: [Order; 3] = [Order::Dmy, Order::Mdy, Order::Ymd];

    pub fn label(self) -> &'static str {
        match self {
            Order::Dmy => "DMY",
            Order::Mdy => "MDY",
            Order::Ymd => "YMD",
        }
    }

    fn date_formats(self) -> &'static [&'static str] {
        match self {
            Order::Dmy => DMY_DATE_FORMATS,
            Order::Mdy => MDY_DATE_FORMATS,
            Order::Ymd => YMD_DATE_FORMATS,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseInstantError {
    #[error("value is empty")]
    Empty,
    #[error("'{0}' does not match any supported date shape")]
    Unrecognized(String),
}

/// A successfully parsed value: calendar date, time-of-day (midnight when the
/// input carried none), and an optional UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInstant {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl ParsedInstant {
    /// Canonical ISO-8601 text. With an offset the full local timestamp plus
    /// offset is emitted; without one, exact midnight collapses to the bare
    /// date. Fractional seconds appear only when non-zero, at microsecond
    /// precision.
    pub fn canonical_form(&self) -> String {
        if self.offset.is_none() && self.datetime.time() == NaiveTime::MIN {
            return self.datetime.format("%Y-%m-%d").to_string();
        }
        let mut text = self.datetime.format("%Y-%m-%dT%H:%M:%S").to_string();
        let micros = self.datetime.time().nanosecond() / 1_000;
        if micros != 0 {
            text.push_str(&format!(".{micros:06}"));
        }
        if let Some(offset) = self.offset {
            text.push_str(&offset.to_string());
        }
        text
    }
}

// Two-digit-year variants precede their four-digit counterparts: "%Y" happily
// reads "24" as year 24, while "%y" leaves trailing digits behind on a
// four-digit year and falls through to the next entry.
const YMD_DATE_FORMATS: &[&str] = &["%y %m %d", "%Y %m %d"];
const DMY_DATE_FORMATS: &[&str] = &["%d %m %y", "%d %m %Y", "%d %B %y", "%d %B %Y"];
const MDY_DATE_FORMATS: &[&str] = &["%m %d %y", "%m %d %Y", "%B %d %y", "%B %d %Y"];

// Unhinted interpretation prefers month-day-year, matching the behaviour of
// the usual permissive parsers; ISO input is caught by the year-first entries
// because a four-digit leading group can satisfy no other specifier.
const GENERAL_DATE_FORMATS: &[&str] = &[
    "%m %d %y", "%m %d %Y", "%d %m %y", "%d %m %Y", "%B %d %y", "%B %d %Y", "%d %B %y",
    "%d %B %Y", "%y %m %d", "%Y %m %d",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

static SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<date>.*?)(?:[T ](?P<time>\d{1,2}:\d{2}(?::\d{2})?(?:\.\d+)?)\s*(?P<zone>Z|[+-]\d{2}:?\d{2})?)?$",
    )
    .expect("instant split pattern compiles")
});

static DATE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-/.\s]+").expect("date separator pattern compiles"));

/// Parse a single cell value, optionally prioritising one component order.
///
/// A hint reorders the candidate interpretations; it never rejects a value
/// that would parse without it.
pub fn parse_instant(value: &str, hint: Option<Order>) -> Result<ParsedInstant, ParseInstantError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ParseInstantError::Empty);
    }
    let unrecognized = || ParseInstantError::Unrecognized(trimmed.to_string());
    let captures = SPLIT_RE.captures(trimmed).ok_or_else(unrecognized)?;

    let date_part = captures.name("date").map(|m| m.as_str()).unwrap_or("");
    let date = parse_date_part(date_part, hint).ok_or_else(unrecognized)?;

    let time = match captures.name("time") {
        Some(m) => parse_time_part(m.as_str()).ok_or_else(unrecognized)?,
        None => NaiveTime::MIN,
    };
    let offset = match captures.name("zone") {
        Some(m) => Some(parse_zone_part(m.as_str()).ok_or_else(unrecognized)?),
        None => None,
    };

    Ok(ParsedInstant {
        datetime: date.and_time(time),
        offset,
    })
}

fn parse_date_part(part: &str, hint: Option<Order>) -> Option<NaiveDate> {
    let cleaned = part.replace(',', " ");
    let tokens: Vec<&str> = DATE_SEPARATORS
        .split(cleaned.trim())
        .filter(|token| !token.is_empty())
        .collect();
    if tokens.len() != 3 {
        return None;
    }
    let normalized = tokens.join(" ");
    let hinted = hint.map(Order::date_formats).unwrap_or(&[]);
    hinted
        .iter()
        .chain(GENERAL_DATE_FORMATS)
        .find_map(|format| NaiveDate::parse_from_str(&normalized, format).ok())
}

fn parse_time_part(part: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(part, format).ok())
}

fn parse_zone_part(part: &str) -> Option<FixedOffset> {
    if part == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = part.split_at(1);
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    FixedOffset::east_opt(if sign == "-" { -seconds } else { seconds })
}
