//! Recording conditions and schedulers: when to record, and when next.
//!
//! These are pure predicates over the wall clock; they hold no mutable state.
//! Multiple conditions attached to a task combine with logical AND.

use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};

use crate::data::TimeInterval;
use crate::error::{Error, Result};
use crate::types::{RecordingCondition, RecordingScheduler};

/// Parse a time string in "HH:MM" format
pub fn parse_time(time_str: &str) -> Result<NaiveTime> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return Err(Error::Config(format!(
            "invalid time format '{time_str}', expected HH:MM"
        )));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| Error::Config(format!("invalid hour in '{time_str}'")))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| Error::Config(format!("invalid minute in '{time_str}'")))?;
    NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| Error::Config(format!("time '{time_str}' out of range")))
}

/// Records only while the time of day is inside one interval.
pub struct IsInInterval {
    pub interval: TimeInterval,
}

impl IsInInterval {
    pub fn new(interval: TimeInterval) -> Self {
        IsInInterval { interval }
    }
}

impl RecordingCondition for IsInInterval {
    fn should_record(&self, now: DateTime<Utc>) -> bool {
        self.interval.contains(now.time())
    }
}

/// Records while the time of day is inside any of several intervals.
pub struct IsInIntervals {
    pub intervals: Vec<TimeInterval>,
}

impl IsInIntervals {
    pub fn new(intervals: Vec<TimeInterval>) -> Self {
        IsInIntervals { intervals }
    }
}

impl RecordingCondition for IsInIntervals {
    fn should_record(&self, now: DateTime<Utc>) -> bool {
        self.intervals
            .iter()
            .any(|interval| interval.contains(now.time()))
    }
}

impl RecordingScheduler for IsInIntervals {
    fn time_until_next(&self, now: DateTime<Utc>) -> Duration {
        let time = now.time();
        if self.intervals.iter().any(|i| i.contains(time)) {
            return Duration::ZERO;
        }
        let seconds = self
            .intervals
            .iter()
            .map(|i| i.seconds_until_start(time))
            .min()
            .unwrap_or(0);
        Duration::from_secs(seconds)
    }
}

/// Waits a constant amount of time between recordings.
pub struct IntervalScheduler {
    pub interval: Duration,
}

impl IntervalScheduler {
    pub fn new(interval: Duration) -> Self {
        IntervalScheduler { interval }
    }
}

impl RecordingScheduler for IntervalScheduler {
    fn time_until_next(&self, _now: DateTime<Utc>) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn interval(start: (u32, u32), end: (u32, u32)) -> TimeInterval {
        TimeInterval::new(
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn should_record_inclusive_on_both_bounds() {
        let condition = IsInInterval::new(interval((8, 0), (17, 0)));
        assert!(condition.should_record(at(8, 0)));
        assert!(condition.should_record(at(12, 30)));
        assert!(condition.should_record(at(17, 0)));
        assert!(!condition.should_record(at(17, 1)));
        assert!(!condition.should_record(at(7, 59)));
    }

    #[test]
    fn multiple_intervals_record_in_any() {
        let condition = IsInIntervals::new(vec![interval((6, 0), (8, 0)), interval((20, 0), (22, 0))]);
        assert!(condition.should_record(at(7, 0)));
        assert!(condition.should_record(at(21, 0)));
        assert!(!condition.should_record(at(12, 0)));
    }

    #[test]
    fn time_until_next_is_zero_inside_window() {
        let scheduler = IsInIntervals::new(vec![interval((8, 0), (17, 0))]);
        assert_eq!(scheduler.time_until_next(at(12, 0)), Duration::ZERO);
    }

    #[test]
    fn time_until_next_counts_to_next_start() {
        let scheduler = IsInIntervals::new(vec![interval((8, 0), (17, 0))]);
        assert_eq!(
            scheduler.time_until_next(at(7, 0)),
            Duration::from_secs(3600)
        );
        // After today's window: wait until tomorrow 08:00.
        assert_eq!(
            scheduler.time_until_next(at(18, 0)),
            Duration::from_secs(14 * 3600)
        );
    }

    #[test]
    fn time_until_next_picks_nearest_interval() {
        let scheduler = IsInIntervals::new(vec![interval((6, 0), (8, 0)), interval((20, 0), (22, 0))]);
        assert_eq!(
            scheduler.time_until_next(at(19, 0)),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn parse_time_accepts_and_rejects() {
        assert_eq!(parse_time("08:30").unwrap(), NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("8").is_err());
        assert!(parse_time("ab:cd").is_err());
    }
}
