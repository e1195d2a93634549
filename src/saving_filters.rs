//! Saving filters: retention predicates over a recording and its model
//! outputs, evaluated by the file management task.
//!
//! The configured list combines with AND; a recording is kept only when every
//! filter agrees. The dawn/dusk filters are internally an OR over their two
//! windows.

use chrono::Duration;

use crate::data::{ModelOutput, Recording, TimeInterval};
use crate::error::{Error, Result};
use crate::solar::sun_times;
use crate::types::SavingFilter;

/// Keeps recordings whose time of day falls inside an interval.
pub struct SaveIfInInterval {
    pub interval: TimeInterval,
}

impl SaveIfInInterval {
    pub fn new(interval: TimeInterval) -> Self {
        SaveIfInInterval { interval }
    }
}

impl SavingFilter for SaveIfInInterval {
    fn should_save(&self, recording: &Recording, _outputs: &[ModelOutput]) -> bool {
        self.interval.contains(recording.datetime.time())
    }
}

/// Duty cycle: keeps the first `duration` minutes of every `period` minutes.
pub struct DutyCycleFilter {
    duration_minutes: u32,
    period_minutes: u32,
}

impl DutyCycleFilter {
    pub fn new(duration_minutes: u32, period_minutes: u32) -> Result<Self> {
        if period_minutes == 0 {
            return Err(Error::Validation("duty cycle period must be positive".into()));
        }
        if duration_minutes > period_minutes {
            return Err(Error::Validation(format!(
                "duty cycle duration {duration_minutes} exceeds period {period_minutes}"
            )));
        }
        Ok(DutyCycleFilter {
            duration_minutes,
            period_minutes,
        })
    }
}

impl SavingFilter for DutyCycleFilter {
    fn should_save(&self, recording: &Recording, _outputs: &[ModelOutput]) -> bool {
        use chrono::Timelike;
        let time = recording.datetime;
        let elapsed =
            f64::from(time.minute() % self.period_minutes) + f64::from(time.second()) / 60.0;
        elapsed < f64::from(self.duration_minutes)
    }
}

/// Keeps recordings made within `minutes` before sunrise or before sunset at
/// the configured location.
pub struct BeforeDawnDuskFilter {
    pub minutes: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl SavingFilter for BeforeDawnDuskFilter {
    fn should_save(&self, recording: &Recording, _outputs: &[ModelOutput]) -> bool {
        let when = recording.datetime;
        let Some(sun) = sun_times(when.date_naive(), self.latitude, self.longitude) else {
            return false;
        };
        let offset = Duration::minutes(self.minutes);
        (sun.sunrise - offset <= when && when <= sun.sunrise)
            || (sun.sunset - offset <= when && when <= sun.sunset)
    }
}

/// Keeps recordings made within `minutes` after sunrise or after sunset at
/// the configured location.
pub struct AfterDawnDuskFilter {
    pub minutes: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl SavingFilter for AfterDawnDuskFilter {
    fn should_save(&self, recording: &Recording, _outputs: &[ModelOutput]) -> bool {
        let when = recording.datetime;
        let Some(sun) = sun_times(when.date_naive(), self.latitude, self.longitude) else {
            return false;
        };
        let offset = Duration::minutes(self.minutes);
        (sun.sunrise <= when && when <= sun.sunrise + offset)
            || (sun.sunset <= when && when <= sun.sunset + offset)
    }
}

/// Keeps recordings with any tag or detection at or above a threshold.
pub struct SavingThresholdFilter {
    pub threshold: f64,
}

impl SavingThresholdFilter {
    pub fn new(threshold: f64) -> Self {
        SavingThresholdFilter { threshold }
    }

    fn has_confident_output(&self, output: &ModelOutput) -> bool {
        output.tags.iter().any(|t| t.probability >= self.threshold)
            || output
                .detections
                .iter()
                .any(|d| d.probability >= self.threshold)
    }
}

impl SavingFilter for SavingThresholdFilter {
    fn should_save(&self, _recording: &Recording, outputs: &[ModelOutput]) -> bool {
        outputs.iter().any(|output| self.has_confident_output(output))
    }
}

/// Keeps recordings carrying confident predictions for an allow-list of
/// (key, value) tags.
pub struct DetectionTagsFilter {
    pub tags: Vec<(String, String)>,
    pub threshold: f64,
}

impl DetectionTagsFilter {
    pub fn new(tags: Vec<(String, String)>, threshold: f64) -> Self {
        DetectionTagsFilter { tags, threshold }
    }

    fn allows(&self, key: &str, value: &str) -> bool {
        self.tags.iter().any(|(k, v)| k == key && v == value)
    }

    fn has_confident_tag(&self, output: &ModelOutput) -> bool {
        if output
            .tags
            .iter()
            .any(|t| self.allows(&t.key, &t.value) && t.probability >= self.threshold)
        {
            return true;
        }

        output.detections.iter().any(|detection| {
            detection.probability >= self.threshold
                && detection
                    .tags
                    .iter()
                    .any(|t| self.allows(&t.key, &t.value) && t.probability >= self.threshold)
        })
    }
}

impl SavingFilter for DetectionTagsFilter {
    fn should_save(&self, _recording: &Recording, outputs: &[ModelOutput]) -> bool {
        outputs.iter().any(|output| self.has_confident_tag(output))
    }
}
