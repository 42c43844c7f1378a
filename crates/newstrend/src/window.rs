//! Half-open time windows `[start, end)`.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::db::to_db_timestamp;
use crate::error::{NewstrendError, Result};

/// A century. Longer spans are rejected before any date arithmetic.
pub const MAX_SPAN_HOURS: i64 = 100 * 365 * 24;

/// `hours` as a duration, or `HoursOutOfRange` past [`MAX_SPAN_HOURS`].
pub fn span_hours(hours: i64) -> Result<Duration> {
    if !(0..=MAX_SPAN_HOURS).contains(&hours) {
        return Err(NewstrendError::HoursOutOfRange {
            hours,
            max: MAX_SPAN_HOURS,
        });
    }
    Duration::try_hours(hours).ok_or(NewstrendError::HoursOutOfRange {
        hours,
        max: MAX_SPAN_HOURS,
    })
}

fn shift(at: DateTime<Utc>, hours: i64, forward: bool) -> Result<DateTime<Utc>> {
    let delta = span_hours(hours)?;
    let shifted = if forward {
        at.checked_add_signed(delta)
    } else {
        at.checked_sub_signed(delta)
    };
    shifted.ok_or(NewstrendError::HoursOutOfRange {
        hours,
        max: MAX_SPAN_HOURS,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Builds a window, rejecting `start > end`. An equal pair is a valid,
    /// empty window.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(NewstrendError::InvalidWindow {
                start: to_db_timestamp(start),
                end: to_db_timestamp(end),
            });
        }
        Ok(Self { start, end })
    }

    /// The `hours` before `end`. Negative hours are treated as zero.
    pub fn trailing(end: DateTime<Utc>, hours: i64) -> Result<Self> {
        Ok(Self {
            start: shift(end, hours.max(0), false)?,
            end,
        })
    }

    /// `[now - lookback, now + lookahead)`. Negative hours are treated as zero.
    pub fn around(now: DateTime<Utc>, lookback_hours: i64, lookahead_hours: i64) -> Result<Self> {
        Ok(Self {
            start: shift(now, lookback_hours.max(0), false)?,
            end: shift(now, lookahead_hours.max(0), true)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            to_db_timestamp(self.start),
            to_db_timestamp(self.end)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_reversed_window_rejected() {
        assert!(TimeWindow::new(at(3), at(1)).is_err());
        assert!(TimeWindow::new(at(3), at(3)).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_and_around() {
        assert_eq!(TimeWindow::trailing(at(10), 4).unwrap().start, at(6));
        assert!(TimeWindow::trailing(at(10), -4).unwrap().is_empty());
        let w = TimeWindow::around(at(10), 2, 1).unwrap();
        assert_eq!((w.start, w.end), (at(8), at(11)));
        assert_eq!(w.to_string(), "[2026-03-01T08:00:00.000Z, 2026-03-01T11:00:00.000Z)");
    }

    #[test]
    fn test_oversized_spans_are_errors() {
        for hours in [MAX_SPAN_HOURS + 1, 10_000_000_000, i64::MAX] {
            let err = TimeWindow::trailing(at(10), hours).unwrap_err();
            assert!(matches!(err, NewstrendError::HoursOutOfRange { .. }), "{}", err);
            assert!(TimeWindow::around(at(10), 1, hours).is_err());
            assert!(TimeWindow::around(at(10), hours, 1).is_err());
        }
        assert!(TimeWindow::trailing(at(10), MAX_SPAN_HOURS).is_ok());
    }
}
