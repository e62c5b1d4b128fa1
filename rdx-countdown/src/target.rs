//! Target specifications: what a countdown counts towards.
//!
//! A target is either a single point in time or an ordered list of points
//! ("multi-date"). Text points are parsed lazily on every evaluation, and a
//! point that can't be resolved is reported as `None` rather than an error.

use crate::common::{Millis, MILLIS_PER_SECOND};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Naive date-time layouts accepted for text targets, interpreted in the
/// configured timezone.
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// One candidate instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPoint {
    /// Epoch milliseconds, or a remaining duration in controlled mode.
    Timestamp(Millis),
    Instant(DateTime<Utc>),
    /// Any text accepted by [`parse_date`].
    Text(String),
}

impl TargetPoint {
    /// Resolves this point into epoch milliseconds.
    pub fn resolve(&self, timezone: Tz) -> Option<Millis> {
        match self {
            TargetPoint::Timestamp(millis) => Some(*millis),
            TargetPoint::Instant(instant) => Some(instant.timestamp_millis()),
            TargetPoint::Text(text) => parse_date(text, timezone),
        }
    }
}

impl TargetPoint {
    /// Parses a command-line target.
    ///
    /// `+SECONDS` means that many seconds after `now`; anything else must be
    /// accepted by [`parse_date`] and is kept as text.
    pub fn from_arg(arg: &str, now: Millis, timezone: Tz) -> Result<Self> {
        if let Some(seconds) = arg.strip_prefix('+') {
            let seconds: Millis = seconds
                .parse()
                .with_context(|| format!("'{arg}' is not a valid +SECONDS offset"))?;
            return Ok(TargetPoint::Timestamp(
                now.saturating_add(seconds.saturating_mul(MILLIS_PER_SECOND)),
            ));
        }
        if parse_date(arg, timezone).is_none() {
            bail!("'{arg}' is not a recognized date");
        }
        Ok(TargetPoint::Text(arg.to_string()))
    }
}

impl From<Millis> for TargetPoint {
    fn from(millis: Millis) -> Self {
        TargetPoint::Timestamp(millis)
    }
}

impl From<DateTime<Utc>> for TargetPoint {
    fn from(instant: DateTime<Utc>) -> Self {
        TargetPoint::Instant(instant)
    }
}

impl From<&str> for TargetPoint {
    fn from(text: &str) -> Self {
        TargetPoint::Text(text.to_string())
    }
}

impl From<String> for TargetPoint {
    fn from(text: String) -> Self {
        TargetPoint::Text(text)
    }
}

/// The full target of a countdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Single(TargetPoint),
    /// Ordered candidates; the first one still in the future is active.
    Multi(Vec<TargetPoint>),
}

impl TargetSpec {
    /// Builds a multi-date target from anything convertible into points.
    pub fn multi<I, P>(points: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<TargetPoint>,
    {
        TargetSpec::Multi(points.into_iter().map(Into::into).collect())
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, TargetSpec::Multi(_))
    }

    /// Picks the active point relative to `now`.
    ///
    /// For a sequence, the first element (in sequence order) resolving to an
    /// instant after `now` wins; unresolvable elements never qualify. When none
    /// qualify the last element is used. Returns `None` only for an empty sequence.
    pub fn select(&self, now: Millis, timezone: Tz) -> Option<&TargetPoint> {
        match self {
            TargetSpec::Single(point) => Some(point),
            TargetSpec::Multi(points) => points
                .iter()
                .find(|point| point.resolve(timezone).is_some_and(|at| at > now))
                .or_else(|| points.last()),
        }
    }
}

impl From<TargetPoint> for TargetSpec {
    fn from(point: TargetPoint) -> Self {
        TargetSpec::Single(point)
    }
}

impl From<Millis> for TargetSpec {
    fn from(millis: Millis) -> Self {
        TargetSpec::Single(millis.into())
    }
}

impl From<DateTime<Utc>> for TargetSpec {
    fn from(instant: DateTime<Utc>) -> Self {
        TargetSpec::Single(instant.into())
    }
}

impl From<&str> for TargetSpec {
    fn from(text: &str) -> Self {
        TargetSpec::Single(text.into())
    }
}

impl From<String> for TargetSpec {
    fn from(text: String) -> Self {
        TargetSpec::Single(text.into())
    }
}

impl From<Vec<TargetPoint>> for TargetSpec {
    fn from(points: Vec<TargetPoint>) -> Self {
        TargetSpec::Multi(points)
    }
}

/// Parses a date string into epoch milliseconds.
///
/// Accepted forms, tried in order:
/// - an optionally signed all-digit string, read as epoch milliseconds
/// - RFC 3339 (`2026-01-01T00:00:00Z`, `2026-01-01T09:00:00+09:00`)
/// - `YYYY-MM-DD[ T]HH:MM[:SS[.fff]]`, read in `timezone`
/// - `YYYY-MM-DD`, read as midnight UTC
pub fn parse_date(text: &str, timezone: Tz) -> Option<Millis> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse::<Millis>().ok();
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.timestamp_millis());
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return timezone
                .from_local_datetime(&naive)
                .earliest()
                .map(|local| local.with_timezone(&Utc).timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}
