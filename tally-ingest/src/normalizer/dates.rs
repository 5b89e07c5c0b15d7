//! Date parsing: the variant's declared pattern first, then a conservative fallback.
//!
//! Fallback day/month rule for all-numeric `a/b/y` dates (also `-` and `.`):
//! a first component above 12 is the day, a second component above 12 is the
//! day, equal components need no decision. Anything else (e.g. `01/02/2024`) is
//! rejected as ambiguous instead of guessed.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use tally_core::RowError;

/// Unambiguous layouts tried by the fallback parser, in order.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%Y%m%d",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<a>\d{1,2})[/.-](?P<b>\d{1,2})[/.-](?P<y>\d{2}|\d{4})$")
        .expect("numeric date pattern compiles")
});

/// Parse `raw` with `declared` first (when given), then the fallback parser.
pub fn parse_date(raw: &str, declared: Option<&str>) -> Result<NaiveDate, RowError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(date_error(raw, "empty value"));
    }

    if let Some(fmt) = declared {
        if let Some(date) = parse_with_format(s, fmt) {
            return Ok(date);
        }
    }

    match parse_fallback(s) {
        Ok(date) => Ok(date),
        Err(reason) => {
            let reason = match declared {
                Some(fmt) => format!("does not match '{fmt}'; fallback: {reason}"),
                None => reason,
            };
            Err(date_error(raw, &reason))
        }
    }
}

/// Parse with a chrono strftime pattern. Patterns carrying a time component
/// yield the date part.
pub fn parse_with_format(s: &str, fmt: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, fmt)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
}

fn parse_fallback(s: &str) -> Result<NaiveDate, String> {
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    parse_numeric(s)
}

fn parse_numeric(s: &str) -> Result<NaiveDate, String> {
    let caps = NUMERIC_DATE
        .captures(s)
        .ok_or_else(|| "unrecognized date format".to_string())?;

    // The pattern guarantees short digit runs, so these parses cannot overflow.
    let a: u32 = caps["a"].parse().map_err(|_| "bad day/month".to_string())?;
    let b: u32 = caps["b"].parse().map_err(|_| "bad day/month".to_string())?;
    let year_raw = &caps["y"];
    let mut year: i32 = year_raw.parse().map_err(|_| "bad year".to_string())?;
    if year_raw.len() == 2 {
        // Same pivot as strftime's %y.
        year += if year < 70 { 2000 } else { 1900 };
    }

    let (month, day) = if a > 12 {
        (b, a)
    } else if b > 12 || a == b {
        (a, b)
    } else {
        return Err(format!(
            "ambiguous day/month order in '{s}'; declare a date_format"
        ));
    };

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| "no such calendar date".to_string())
}

fn date_error(raw: &str, reason: &str) -> RowError {
    RowError::DateParse {
        raw: raw.to_string(),
        reason: reason.to_string(),
    }
}
