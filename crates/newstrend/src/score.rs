//! Fixed-point keyword scores.
//!
//! Scores are persisted with exactly six fractional digits. Rounding is
//! half-up (away from zero on a tie) and is applied to the shortest decimal
//! representation of the incoming `f64`, so an analyzer value printed as
//! `0.1234565` rounds to `0.123457` even though its binary value sits just
//! below the tie.

use std::fmt;

/// Number of stored fractional digits.
pub const SCALE: u32 = 6;

const MICROS_PER_UNIT: i64 = 1_000_000;

/// Largest magnitude accepted before the micro-unit representation overflows.
const MAX_ABS_UNITS: f64 = 9.0e12;

/// A score rounded to six decimal places, stored as millionths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(i64);

impl Score {
    /// Rounds an analyzer score half-up to six decimals.
    ///
    /// Returns `None` for NaN, infinities and magnitudes too large to store.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.abs() >= MAX_ABS_UNITS {
            return None;
        }

        // `Display` for f64 yields the shortest round-tripping decimal and
        // never switches to exponent notation.
        let repr = format!("{}", value.abs());
        let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

        let units: i64 = int_part.parse().ok()?;
        let mut digits = frac_part.bytes().map(|b| i64::from(b - b'0'));

        let mut micros = 0i64;
        for _ in 0..SCALE {
            micros = micros * 10 + digits.next().unwrap_or(0);
        }
        if digits.next().is_some_and(|d| d >= 5) {
            micros += 1;
        }

        let magnitude = units * MICROS_PER_UNIT + micros;
        Some(Self(if value.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        }))
    }

    /// Builds a score from its stored millionths.
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        micros_to_f64(self.0 as f64)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let unit = MICROS_PER_UNIT as u64;
        write!(f, "{}{}.{:06}", sign, abs / unit, abs % unit)
    }
}

/// Converts a SQL aggregate over `score_micros` (sum or average) to units.
pub fn micros_to_f64(micros: f64) -> f64 {
    micros / MICROS_PER_UNIT as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tie_rounds_up_from_shortest_repr() {
        let score = Score::from_f64(0.1234565).unwrap();
        assert_eq!(score.micros(), 123_457);
        assert_eq!(score.to_string(), "0.123457");
    }

    #[test]
    fn test_below_tie_truncates() {
        assert_eq!(Score::from_f64(0.1234564).unwrap().micros(), 123_456);
    }

    #[test]
    fn test_short_values_are_exact() {
        assert_eq!(Score::from_f64(0.3).unwrap().micros(), 300_000);
        assert_eq!(Score::from_f64(2.0).unwrap().micros(), 2_000_000);
        assert_eq!(Score::from_f64(0.0).unwrap().micros(), 0);
    }

    #[test]
    fn test_tiny_values_use_plain_decimal() {
        assert_eq!(Score::from_f64(0.0000005).unwrap().micros(), 1);
        assert_eq!(Score::from_f64(0.0000004).unwrap().micros(), 0);
    }

    #[test]
    fn test_negative_rounds_away_from_zero() {
        let score = Score::from_f64(-0.0000015).unwrap();
        assert_eq!(score.micros(), -2);
        assert_eq!(score.to_string(), "-0.000002");
    }

    #[test]
    fn test_rejects_non_finite_and_huge() {
        assert!(Score::from_f64(f64::NAN).is_none());
        assert!(Score::from_f64(f64::INFINITY).is_none());
        assert!(Score::from_f64(1.0e13).is_none());
    }

    #[test]
    fn test_as_f64_round_trip() {
        assert_eq!(Score::from_micros(400_000).as_f64(), 0.4);
        assert_eq!(micros_to_f64(800_000.0), 0.8);
    }
}
