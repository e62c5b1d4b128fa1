//! The time-delta calculator.
//!
//! [`compute_delta`] is a pure function of a [`TargetSpec`] and the current time
//! read from a [`ClockSource`]. It never fails: a target that can't be resolved
//! produces a [`Delta`] flagged as invalid, which callers must guard before
//! displaying.

use crate::common::{Millis, MILLIS_PER_SECOND};
use crate::target::TargetSpec;
use crate::time::ClockSource;
use chrono_tz::Tz;

/// Upper bound of the precision setting, in fractional-second digits.
pub const MAX_PRECISION: i32 = 20;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;

/// An immutable snapshot of the time remaining until the active target.
///
/// `days`..`milliseconds` are decomposed from `|total|`, so they stay
/// non-negative even when overtime lets `total` drop below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delta {
    /// Remaining milliseconds after precision rounding.
    pub total: Millis,
    pub days: u64,
    /// Always in `0..24`.
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
    /// `total <= 0`. Never set on an invalid delta.
    pub completed: bool,
    /// Whether the target was a multi-date sequence.
    pub multi_dates: bool,
    /// `false` when the target could not be resolved to an instant.
    pub valid: bool,
}

impl Delta {
    /// Decomposes a total millisecond count.
    pub fn from_total(total: Millis, multi_dates: bool) -> Self {
        let magnitude = total.unsigned_abs();
        let whole_seconds = magnitude / MILLIS_PER_SECOND as u64;
        Self {
            total,
            days: whole_seconds / SECONDS_PER_DAY,
            hours: (whole_seconds / SECONDS_PER_HOUR) % 24,
            minutes: (whole_seconds / SECONDS_PER_MINUTE) % 60,
            seconds: whole_seconds % 60,
            milliseconds: magnitude % MILLIS_PER_SECOND as u64,
            completed: total <= 0,
            multi_dates,
            valid: true,
        }
    }

    /// The delta produced for an unresolvable target.
    ///
    /// Like a NaN comparison, it is neither completed nor holding time.
    pub fn invalid(multi_dates: bool) -> Self {
        Self {
            total: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            milliseconds: 0,
            completed: false,
            multi_dates,
            valid: false,
        }
    }

    /// True when the delta is valid and time is still left.
    pub fn has_time_left(&self) -> bool {
        self.valid && self.total > 0
    }

    /// Whole seconds represented by the day/hour/minute/second fields.
    pub fn whole_seconds(&self) -> u64 {
        self.days * SECONDS_PER_DAY
            + self.hours * SECONDS_PER_HOUR
            + self.minutes * SECONDS_PER_MINUTE
            + self.seconds
    }
}

/// Inputs of a single evaluation besides the target itself.
#[derive(Clone, Copy)]
pub struct DeltaOptions<'a> {
    pub clock: &'a dyn ClockSource,
    /// Fractional-second digits to keep; clamped into `[0, 20]`.
    pub precision: i32,
    /// Treat the selected point as an already-computed remaining duration.
    pub controlled: bool,
    /// Added to the target in non-controlled mode (time spent paused).
    pub offset_ms: Millis,
    /// Allow `total` to go negative once the target has passed.
    pub overtime: bool,
    /// Zone for text targets that carry no offset.
    pub timezone: Tz,
}

impl<'a> DeltaOptions<'a> {
    pub fn new(clock: &'a dyn ClockSource) -> Self {
        Self {
            clock,
            precision: 0,
            controlled: false,
            offset_ms: 0,
            overtime: false,
            timezone: Tz::UTC,
        }
    }
}

/// Computes the delta between now and the active target.
pub fn compute_delta(target: &TargetSpec, options: &DeltaOptions<'_>) -> Delta {
    let now = options.clock.now_millis();
    let multi_dates = target.is_multi();

    let Some(instant) = target
        .select(now, options.timezone)
        .and_then(|point| point.resolve(options.timezone))
    else {
        return Delta::invalid(multi_dates);
    };

    let remaining = if options.controlled {
        instant
    } else {
        instant
            .saturating_add(options.offset_ms)
            .saturating_sub(now)
    };
    let remaining = if options.overtime {
        remaining
    } else {
        remaining.max(0)
    };

    Delta::from_total(round_to_precision(remaining, options.precision), multi_dates)
}

/// Rounds a millisecond count to `precision` fractional-second digits,
/// half away from zero.
///
/// Three or more digits already fit in whole milliseconds and are left alone.
pub fn round_to_precision(millis: Millis, precision: i32) -> Millis {
    let digits = precision.clamp(0, MAX_PRECISION) as u32;
    if digits >= 3 {
        return millis;
    }
    let unit = 10_u64.pow(3 - digits);
    let magnitude = millis.unsigned_abs();
    let rounded = magnitude.saturating_add(unit / 2) / unit * unit;
    let rounded = Millis::try_from(rounded).unwrap_or(Millis::MAX);
    if millis < 0 {
        -rounded
    } else {
        rounded
    }
}
