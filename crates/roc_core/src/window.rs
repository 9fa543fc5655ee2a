//! On-scene activity windows.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::ActivityWindowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

impl Interval {
    pub fn new(start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self { start, stop }
    }
}

/// Ordered, non-overlapping intervals during which an operation works.
///
/// Validated once at construction; `is_active` never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityWindow {
    intervals: SmallVec<[Interval; 4]>,
}

impl ActivityWindow {
    pub fn new(intervals: impl IntoIterator<Item = Interval>) -> Result<Self, ActivityWindowError> {
        let intervals: SmallVec<[Interval; 4]> = intervals.into_iter().collect();

        for (index, interval) in intervals.iter().enumerate() {
            if interval.start >= interval.stop {
                return Err(ActivityWindowError::InvertedInterval {
                    index,
                    start: interval.start,
                    stop: interval.stop,
                });
            }
            let Some(previous) = index.checked_sub(1).map(|i| intervals[i]) else {
                continue;
            };
            if interval.start == previous.start {
                return Err(ActivityWindowError::DuplicateStart {
                    index,
                    start: interval.start,
                });
            }
            if interval.start < previous.start {
                return Err(ActivityWindowError::NotAscending {
                    index,
                    start: interval.start,
                });
            }
            if interval.start < previous.stop {
                return Err(ActivityWindowError::Overlap {
                    index,
                    start: interval.start,
                    previous_stop: previous.stop,
                });
            }
        }

        Ok(Self { intervals })
    }

    /// True if the step starting at `model_time` lies in some interval up to
    /// its midpoint: `start <= model_time` and `model_time + time_step/2 <= stop`.
    pub fn is_active(&self, model_time: NaiveDateTime, time_step: f64) -> bool {
        #[allow(clippy::cast_possible_truncation)] // step lengths are far below i64 ms
        let half_step = Duration::milliseconds((time_step * 500.0).round() as i64);
        let midpoint = model_time + half_step;
        self.intervals
            .iter()
            .any(|interval| interval.start <= model_time && midpoint <= interval.stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::start_time;

    fn hours(h: i64) -> Duration {
        Duration::hours(h)
    }

    #[test]
    fn active_from_start_but_not_before() {
        let t = start_time();
        let window = ActivityWindow::new([Interval::new(t, t + hours(2))]).unwrap();
        assert!(!window.is_active(t - Duration::minutes(1), 3600.0));
        assert!(window.is_active(t, 3600.0));
    }

    #[test]
    fn inactive_when_half_step_passes_stop() {
        let t = start_time();
        let window = ActivityWindow::new([Interval::new(t, t + hours(2))]).unwrap();
        // 1.5 h + 30 min = stop exactly: still active.
        assert!(window.is_active(t + Duration::minutes(90), 3600.0));
        assert!(!window.is_active(t + Duration::minutes(91), 3600.0));
    }

    #[test]
    fn gap_between_intervals_is_inactive() {
        let t = start_time();
        let window = ActivityWindow::new([
            Interval::new(t, t + hours(1)),
            Interval::new(t + hours(3), t + hours(4)),
        ])
        .unwrap();
        assert!(!window.is_active(t + hours(2), 900.0));
        assert!(window.is_active(t + hours(3), 900.0));
    }

    #[test]
    fn empty_window_is_never_active() {
        let window = ActivityWindow::default();
        assert!(!window.is_active(start_time(), 60.0));
    }

    #[test]
    fn rejects_overlap() {
        let t = start_time();
        let err = ActivityWindow::new([
            Interval::new(t, t + hours(2)),
            Interval::new(t + hours(1), t + hours(3)),
        ])
        .unwrap_err();
        assert!(matches!(err, ActivityWindowError::Overlap { index: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_and_descending_starts() {
        let t = start_time();
        let duplicate = ActivityWindow::new([
            Interval::new(t, t + hours(1)),
            Interval::new(t, t + hours(2)),
        ])
        .unwrap_err();
        assert!(matches!(duplicate, ActivityWindowError::DuplicateStart { index: 1, .. }));

        let descending = ActivityWindow::new([
            Interval::new(t + hours(5), t + hours(6)),
            Interval::new(t, t + hours(1)),
        ])
        .unwrap_err();
        assert!(matches!(descending, ActivityWindowError::NotAscending { index: 1, .. }));
    }

    #[test]
    fn rejects_inverted_interval() {
        let t = start_time();
        let err = ActivityWindow::new([Interval::new(t + hours(1), t)]).unwrap_err();
        assert!(matches!(err, ActivityWindowError::InvertedInterval { index: 0, .. }));
    }

    #[test]
    fn touching_intervals_are_allowed() {
        let t = start_time();
        let window = ActivityWindow::new([
            Interval::new(t, t + hours(1)),
            Interval::new(t + hours(1), t + hours(2)),
        ]);
        assert!(window.is_ok());
    }
}
