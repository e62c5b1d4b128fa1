//! Rendering helpers that turn a [`Delta`] into zero-padded strings.

use crate::delta::Delta;
use std::fmt;

/// Placeholder rendered for every field of an invalid delta.
pub const INVALID_FIELD: &str = "NaN";

/// Left-pads the first run of ASCII digits in `value` with `'0'` up to `length`.
///
/// The value is rendered as-is first, so signs and fractions survive
/// (`-5` becomes `-05`, `1.5` becomes `01.5`). Longer runs are never truncated.
/// Text without digits is padded as a whole, and `length == 0` returns the
/// rendered value untouched.
pub fn zero_pad<T: fmt::Display>(value: T, length: usize) -> String {
    let text = value.to_string();
    if length == 0 {
        return text;
    }

    let (prefix, number, suffix) = match text.find(|c: char| c.is_ascii_digit()) {
        Some(start) => {
            let end = text[start..]
                .find(|c: char| !c.is_ascii_digit())
                .map_or(text.len(), |offset| start + offset);
            (&text[..start], &text[start..end], &text[end..])
        }
        None => ("", text.as_str(), ""),
    };

    let width = number.chars().count();
    if width >= length {
        return text;
    }
    format!("{prefix}{}{number}{suffix}", "0".repeat(length - width))
}

/// Display options for [`format_delta`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Fold days into hours and omit the day field.
    pub days_in_hours: bool,
    pub zero_pad_time: usize,
    pub zero_pad_days: usize,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            days_in_hours: false,
            zero_pad_time: 2,
            zero_pad_days: 2,
        }
    }
}

/// The string view handed to a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDelta {
    /// `None` when days are folded into hours.
    pub days: Option<String>,
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl fmt::Display for FormattedDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(days) = &self.days {
            write!(f, "{days}:")?;
        }
        write!(f, "{}:{}:{}", self.hours, self.minutes, self.seconds)
    }
}

/// Formats the day/hour/minute/second fields of `delta`.
///
/// Minutes and seconds pad to at most two characters. Hours do too, unless
/// days are folded into them, in which case they use the full `zero_pad_time`.
pub fn format_delta(delta: &Delta, options: &FormatOptions) -> FormattedDelta {
    let time_pad = options.zero_pad_time.min(2);

    if !delta.valid {
        let hours_pad = if options.days_in_hours {
            options.zero_pad_time
        } else {
            time_pad
        };
        return FormattedDelta {
            days: (!options.days_in_hours).then(|| zero_pad(INVALID_FIELD, options.zero_pad_days)),
            hours: zero_pad(INVALID_FIELD, hours_pad),
            minutes: zero_pad(INVALID_FIELD, time_pad),
            seconds: zero_pad(INVALID_FIELD, time_pad),
        };
    }

    let (days, hours) = if options.days_in_hours {
        (
            None,
            zero_pad(delta.hours + delta.days * 24, options.zero_pad_time),
        )
    } else {
        (
            Some(zero_pad(delta.days, options.zero_pad_days)),
            zero_pad(delta.hours, time_pad),
        )
    };

    FormattedDelta {
        days,
        hours,
        minutes: zero_pad(delta.minutes, time_pad),
        seconds: zero_pad(delta.seconds, time_pad),
    }
}
