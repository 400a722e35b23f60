//! Publish-time normalization.
//!
//! Listings render times relative to "now" in several shapes. Everything is
//! normalized to `YYYY-MM-DD HH:MM` in the viewer's local time.

use chrono::{Local, NaiveDateTime, TimeDelta};
use regex::Regex;
use thiserror::Error;

use crate::constants::SOURCE_MARKER;

/// Output format of every normalized timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

const JUST_NOW: &str = "刚刚";
const MINUTES_AGO: &str = "分钟";
const TODAY: &str = "今天";

// "05月01日 09:30" as rendered, or "05-01 09:30".
static MONTH_DAY: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?:月|-)(\d{1,2})日?\s*(\d{1,2}):(\d{2})").unwrap()
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeError {
    #[error("no minute count in relative time '{0}'")]
    Minutes(String),
    #[error("invalid month/day time '{0}'")]
    MonthDay(String),
    #[error("empty publish time")]
    Empty,
}

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The local system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Split the time/source line into the time part and the publishing client.
#[must_use]
pub fn split_time_and_source(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once(SOURCE_MARKER) {
        Some((time, source)) => {
            let source = source.split(SOURCE_MARKER).next().unwrap_or(source).trim();
            (time.trim(), (!source.is_empty()).then_some(source))
        }
        None => (raw.trim(), None),
    }
}

/// Normalize a rendered publish time against `now`.
///
/// # Errors
///
/// Returns an error when a relative or month/day form is recognized but
/// its numbers cannot be read, or when the text is empty.
pub fn normalize_publish_time(raw: &str, now: NaiveDateTime) -> Result<String, TimeError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TimeError::Empty);
    }

    if text.contains(JUST_NOW) {
        return Ok(now.format(TIMESTAMP_FORMAT).to_string());
    }

    if let Some(pos) = text.find(MINUTES_AGO) {
        let minutes: i64 = text[..pos]
            .trim()
            .parse()
            .map_err(|_| TimeError::Minutes(text.to_string()))?;
        let published = TimeDelta::try_minutes(minutes)
            .and_then(|ago| now.checked_sub_signed(ago))
            .ok_or_else(|| TimeError::Minutes(text.to_string()))?;
        return Ok(published.format(TIMESTAMP_FORMAT).to_string());
    }

    if let Some(rest) = text.strip_prefix(TODAY) {
        return Ok(format!("{} {}", now.format("%Y-%m-%d"), rest.trim()));
    }

    if let Some(caps) = MONTH_DAY.captures(text) {
        let number = |i: usize| -> Result<u32, TimeError> {
            caps[i]
                .parse()
                .map_err(|_| TimeError::MonthDay(text.to_string()))
        };
        let (month, day, hour, minute) = (number(1)?, number(2)?, number(3)?, number(4)?);
        return Ok(format!(
            "{}-{month:02}-{day:02} {hour:02}:{minute:02}",
            now.format("%Y")
        ));
    }

    Ok(text.chars().take(16).collect())
}
