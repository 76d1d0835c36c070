//! Progress Calculator: time-based "ideal" and stage-based "actual" progress.
//!
//! The two metrics are deliberately independent so a task can run ahead of
//! or behind its schedule. Both are pure functions of their inputs.

use super::dates::{DueDate, ResolvedDates};
use super::types::{Stage, TaskStatus};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Floor reported for in-progress work, so started work never shows 0%.
pub const STARTED_FLOOR: u8 = 5;

/// Both progress metrics for one task, as whole percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub ideal_progress: u8,
    pub actual_progress: u8,
}

impl Progress {
    #[must_use]
    pub fn compute(status: TaskStatus, stage: Option<Stage>, dates: &ResolvedDates, now: DateTime<Utc>) -> Self {
        Self {
            ideal_progress: ideal_progress(dates.effective_start, dates.effective_due, now),
            actual_progress: actual_progress(status, stage),
        }
    }

    /// Positive when the pipeline is ahead of the clock.
    #[must_use]
    pub fn drift(&self) -> i16 {
        i16::from(self.actual_progress) - i16::from(self.ideal_progress)
    }
}

/// Share of the start→due window already elapsed at `now`.
///
/// Dates are taken at UTC midnight. An unbounded task never shows time
/// pressure; a window with `due <= start` is already fully elapsed.
#[must_use]
pub fn ideal_progress(start: NaiveDate, due: DueDate, now: DateTime<Utc>) -> u8 {
    let DueDate::On(due) = due else {
        return 0;
    };
    if due <= start {
        return 100;
    }

    let start = midnight(start);
    let window = (midnight(due) - start).num_milliseconds();
    let elapsed = (now - start).num_milliseconds();

    #[allow(clippy::cast_precision_loss)]
    let pct = (elapsed as f64 / window as f64 * 100.0).round();
    clamp_percent(pct)
}

/// Position in the pipeline as a coarse percentage.
///
/// `Done` is 100 and `Pending` is 0. In-progress work reports the start of
/// its stage's fifth of the pipeline plus the started floor.
#[must_use]
pub fn actual_progress(status: TaskStatus, stage: Option<Stage>) -> u8 {
    match status {
        TaskStatus::Done => 100,
        TaskStatus::Pending => 0,
        TaskStatus::InProgress => {
            let Some(stage) = stage else {
                return STARTED_FLOOR;
            };
            #[allow(clippy::cast_precision_loss)]
            let pct = (stage.index() as f64 / Stage::ALL.len() as f64 * 100.0).round();
            clamp_percent(pct + f64::from(STARTED_FLOOR))
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_percent(pct: f64) -> u8 {
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_ideal_mid_window() {
        let pct = ideal_progress(date(2024, 1, 1), DueDate::On(date(2024, 1, 10)), at(2024, 1, 5));
        assert_eq!(pct, 44);
    }

    #[test]
    fn test_ideal_unbounded_is_zero() {
        for now in [at(1990, 1, 1), at(2024, 6, 1), at(2099, 1, 1)] {
            assert_eq!(ideal_progress(date(2024, 1, 1), DueDate::Unbounded, now), 0);
        }
    }

    #[test]
    fn test_ideal_degenerate_window_is_full() {
        assert_eq!(ideal_progress(date(2024, 1, 5), DueDate::On(date(2024, 1, 5)), at(2020, 1, 1)), 100);
        assert_eq!(ideal_progress(date(2024, 1, 5), DueDate::On(date(2024, 1, 2)), at(2020, 1, 1)), 100);
    }

    #[test]
    fn test_ideal_clamps() {
        let due = DueDate::On(date(2024, 1, 10));
        assert_eq!(ideal_progress(date(2024, 1, 1), due, at(2023, 12, 1)), 0);
        assert_eq!(ideal_progress(date(2024, 1, 1), due, at(2024, 3, 1)), 100);
    }

    #[test]
    fn test_actual_terminal_statuses() {
        for stage in [None, Some(Stage::Review)] {
            assert_eq!(actual_progress(TaskStatus::Done, stage), 100);
            assert_eq!(actual_progress(TaskStatus::Pending, stage), 0);
        }
    }

    #[test]
    fn test_actual_per_stage() {
        let got: Vec<u8> = Stage::ALL
            .iter()
            .map(|&s| actual_progress(TaskStatus::InProgress, Some(s)))
            .collect();
        assert_eq!(got, vec![5, 25, 45, 65, 85]);
        assert_eq!(actual_progress(TaskStatus::InProgress, None), STARTED_FLOOR);
    }

    #[test]
    fn test_drift() {
        let p = Progress {
            ideal_progress: 60,
            actual_progress: 45,
        };
        assert_eq!(p.drift(), -15);
    }
}
