//! Rational numbers for exact time-base arithmetic.

use std::cmp::Ordering;
use std::fmt;

/// A rational number with a positive denominator.
///
/// Time bases are represented as rationals so that timestamp conversion
/// stays exact: rescaling goes through 128-bit intermediates and rounds
/// once, at the end.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub num: i64,
    /// Denominator, always positive.
    pub den: i64,
}

impl Rational {
    /// Create a new rational, normalizing the sign into the numerator.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero.
    pub fn new(num: i64, den: i64) -> Self {
        assert!(den != 0, "Denominator cannot be zero");
        if den < 0 {
            Self { num: -num, den: -den }
        } else {
            Self { num, den }
        }
    }

    /// A rational equal to the given integer.
    pub const fn from_int(n: i64) -> Self {
        Self { num: n, den: 1 }
    }

    /// Whether this rational equals zero.
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Reduce to lowest terms.
    pub fn reduce(&self) -> Self {
        if self.num == 0 {
            return Self { num: 0, den: 1 };
        }
        let g = gcd(self.num.unsigned_abs(), self.den.unsigned_abs()) as i64;
        Self {
            num: self.num / g,
            den: self.den / g,
        }
    }

    /// Reciprocal of this rational.
    ///
    /// # Panics
    ///
    /// Panics if the numerator is zero.
    pub fn invert(&self) -> Self {
        assert!(self.num != 0, "Cannot invert zero");
        Self::new(self.den, self.num)
    }

    /// Approximate value as f64, for display and heuristics only.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rational({}/{})", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.num as i128 * other.den as i128;
        let rhs = other.num as i128 * self.den as i128;
        lhs.cmp(&rhs)
    }
}

impl From<(i64, i64)> for Rational {
    fn from((num, den): (i64, i64)) -> Self {
        Self::new(num, den)
    }
}

/// Rescale `value` from time base `from` to time base `to`.
///
/// Computed as `value * from / to` in 128-bit arithmetic, rounded to the
/// nearest integer with ties away from zero. Returns `None` when the result
/// does not fit in an i64.
pub fn rescale_checked(value: i64, from: Rational, to: Rational) -> Option<i64> {
    let num = from.num as i128 * to.den as i128;
    let den = from.den as i128 * to.num as i128;
    debug_assert!(den > 0, "time bases must be positive");
    let scaled = value as i128 * num;
    let rounded = if scaled >= 0 {
        (scaled + den / 2) / den
    } else {
        (scaled - den / 2) / den
    };
    i64::try_from(rounded).ok()
}

/// Rescale `value` from time base `from` to time base `to`, saturating at
/// the i64 range on overflow.
pub fn rescale(value: i64, from: Rational, to: Rational) -> i64 {
    rescale_checked(value, from, to).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Greatest common divisor, Euclid.
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
