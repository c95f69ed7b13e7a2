//! Time bases and command-line time parsing.
//!
//! The session layer normalizes every timestamp into a single global unit
//! of one microsecond per tick before combining values from different
//! inputs. [`TimeBase::MICROS`] is that unit.

use crate::error::{Error, Result};
use crate::rational::{self, Rational};
use std::fmt;

/// A stream time base: the duration in seconds of one timestamp tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeBase(pub Rational);

impl TimeBase {
    /// Create a time base from numerator and denominator.
    pub fn new(num: i64, den: i64) -> Self {
        Self(Rational::new(num, den))
    }

    /// The global microsecond unit (1/1000000).
    pub const MICROS: Self = Self(Rational { num: 1, den: 1_000_000 });

    /// Millisecond ticks (1/1000).
    pub const MILLIS: Self = Self(Rational { num: 1, den: 1000 });

    /// The 90 kHz MPEG tick (1/90000).
    pub const MPEG: Self = Self(Rational { num: 1, den: 90_000 });

    /// Whole seconds (1/1).
    pub const SECONDS: Self = Self(Rational { num: 1, den: 1 });

    /// Convert a tick count in this base to another base.
    pub fn convert(&self, value: i64, target: TimeBase) -> i64 {
        rational::rescale(value, self.0, target.0)
    }

    /// Convert a tick count in this base to global microseconds.
    pub fn to_micros(&self, value: i64) -> i64 {
        self.convert(value, Self::MICROS)
    }

    /// The underlying rational.
    pub fn as_rational(&self) -> Rational {
        self.0
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::MICROS
    }
}

impl From<(i64, i64)> for TimeBase {
    fn from((num, den): (i64, i64)) -> Self {
        Self::new(num, den)
    }
}

impl fmt::Display for TimeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const MICROS_PER_SECOND: i64 = 1_000_000;

/// Parse a command-line time value into microseconds.
///
/// Accepted forms, each with an optional leading `-`:
/// - `[HH:]MM:SS[.fraction]` clock syntax, e.g. `01:02:03.5`
/// - `SECONDS[.fraction]` with an optional `s`, `ms` or `us` suffix,
///   e.g. `45`, `3.25`, `1500ms`, `200us`
pub fn parse_time(input: &str) -> Result<i64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::invalid_time(input, "empty string"));
    }

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if body.is_empty() {
        return Err(Error::invalid_time(input, "sign without digits"));
    }

    let micros = if body.contains(':') {
        parse_clock(input, body)?
    } else {
        parse_seconds(input, body)?
    };

    Ok(if negative { -micros } else { micros })
}

/// `[HH:]MM:SS[.fraction]`
fn parse_clock(original: &str, body: &str) -> Result<i64> {
    let parts: Vec<&str> = body.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [m, sec] => ("0", *m, *sec),
        [h, m, sec] => (*h, *m, *sec),
        _ => return Err(Error::invalid_time(original, "expected [HH:]MM:SS")),
    };

    let hours: i64 = hours
        .parse()
        .map_err(|_| Error::invalid_time(original, "invalid hours field"))?;
    let minutes: i64 = minutes
        .parse()
        .map_err(|_| Error::invalid_time(original, "invalid minutes field"))?;
    if minutes >= 60 {
        return Err(Error::invalid_time(original, "minutes must be below 60"));
    }
    let sec_micros = parse_fractional_seconds(original, seconds)?;
    if sec_micros >= 60 * MICROS_PER_SECOND {
        return Err(Error::invalid_time(original, "seconds must be below 60"));
    }

    Ok((hours * 3600 + minutes * 60) * MICROS_PER_SECOND + sec_micros)
}

/// `SECONDS[.fraction][s|ms|us]`
fn parse_seconds(original: &str, body: &str) -> Result<i64> {
    let (body, per_unit) = if let Some(stripped) = body.strip_suffix("ms") {
        (stripped, 1000)
    } else if let Some(stripped) = body.strip_suffix("us") {
        (stripped, 1)
    } else if let Some(stripped) = body.strip_suffix('s') {
        (stripped, MICROS_PER_SECOND)
    } else {
        (body, MICROS_PER_SECOND)
    };
    if body.is_empty() {
        return Err(Error::invalid_time(original, "suffix without digits"));
    }

    let micros_at_unit = parse_fractional(original, body, per_unit)?;
    Ok(micros_at_unit)
}

/// Seconds field of the clock syntax: `SS[.fraction]`, value in microseconds.
fn parse_fractional_seconds(original: &str, field: &str) -> Result<i64> {
    parse_fractional(original, field, MICROS_PER_SECOND)
}

/// Parse `DIGITS[.DIGITS]` into microseconds, where one whole unit is
/// `unit_micros` microseconds. The fraction is truncated past the
/// microsecond digit.
fn parse_fractional(original: &str, field: &str, unit_micros: i64) -> Result<i64> {
    let (whole, frac) = match field.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (field, None),
    };
    if whole.is_empty() && frac.map_or(true, str::is_empty) {
        return Err(Error::invalid_time(original, "no digits"));
    }

    let mut micros: i64 = 0;
    if !whole.is_empty() {
        let n: i64 = whole
            .parse()
            .map_err(|_| Error::invalid_time(original, "invalid digits"))?;
        micros = n
            .checked_mul(unit_micros)
            .ok_or_else(|| Error::invalid_time(original, "value out of range"))?;
    }

    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_time(original, "invalid fraction"));
        }
        // Scale digit by digit so 1500ms-style sub-unit fractions stay exact.
        let mut scale = unit_micros;
        for b in frac.bytes() {
            scale /= 10;
            if scale == 0 {
                break;
            }
            micros += (b - b'0') as i64 * scale;
        }
    }

    Ok(micros)
}
