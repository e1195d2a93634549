//! Domain entities shared by the stores, filters and tasks.
//!
//! Constructors validate field ranges and reject bad values instead of
//! coercing them. Tags and detections are kept in a deterministic order
//! (probability descending, ties by key/value descending) so that serialized
//! messages are reproducible byte for byte.

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::{DateTime, NaiveTime, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Current time truncated to millisecond precision.
///
/// Datetimes are persisted as epoch milliseconds, so anything that will be
/// compared against a stored value must be truncated up front.
pub fn now_millis() -> DateTime<Utc> {
    millis_to_datetime(Utc::now().timestamp_millis()).expect("current time is representable")
}

/// Convert stored epoch milliseconds back to a datetime.
pub fn millis_to_datetime(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::Validation(format!("timestamp {ms} out of range")))
}

/// An inclusive interval between two times of day.
///
/// `start > end` denotes an interval wrapping over midnight, e.g.
/// 22:00..=04:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        TimeInterval { start, end }
    }

    /// Whether `time` falls inside the interval, both bounds inclusive.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start > self.end {
            self.start <= time || time <= self.end
        } else {
            self.start <= time && time <= self.end
        }
    }

    /// Seconds from `time` until the start of this interval, 0 when inside.
    pub fn seconds_until_start(&self, time: NaiveTime) -> u64 {
        if self.contains(time) {
            return 0;
        }
        let now_s = u64::from(time.num_seconds_from_midnight());
        let start_s = u64::from(self.start.num_seconds_from_midnight());
        if start_s > now_s {
            start_s - now_s
        } else {
            86_400 - now_s + start_s
        }
    }
}

/// A field placement of the device: where it sits and since when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Uuid,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub started_on: DateTime<Utc>,
    pub ended_on: Option<DateTime<Utc>>,
}

impl Deployment {
    pub fn new(name: String, latitude: Option<f64>, longitude: Option<f64>) -> Result<Self> {
        if let Some(lat) = latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Error::Validation(format!(
                    "latitude {lat} must be between -90 and 90"
                )));
            }
        }
        if let Some(lon) = longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(Error::Validation(format!(
                    "longitude {lon} must be between -180 and 180"
                )));
            }
        }
        Ok(Deployment {
            id: Uuid::new_v4(),
            name,
            latitude,
            longitude,
            started_on: now_millis(),
            ended_on: None,
        })
    }
}

/// A single audio file captured from the microphone.
///
/// `path` is None before capture completes and again once the temporary file
/// has been purged; the row itself is never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub datetime: DateTime<Utc>,
    pub duration: f64,
    pub samplerate: u32,
    pub channels: u16,
    pub path: Option<PathBuf>,
}

impl Recording {
    pub fn new(
        deployment_id: Uuid,
        datetime: DateTime<Utc>,
        duration: f64,
        samplerate: u32,
        channels: u16,
        path: Option<PathBuf>,
    ) -> Result<Self> {
        if duration <= 0.0 {
            return Err(Error::Validation(format!(
                "duration {duration} must be greater than 0"
            )));
        }
        if samplerate == 0 {
            return Err(Error::Validation("samplerate must be greater than 0".into()));
        }
        if channels == 0 {
            return Err(Error::Validation("channels must be 1 or greater".into()));
        }
        Ok(Recording {
            id: Uuid::new_v4(),
            deployment_id,
            datetime,
            duration,
            samplerate,
            channels,
            path,
        })
    }
}

/// A label predicted by a model, with its confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedTag {
    pub key: String,
    pub value: String,
    pub probability: f64,
}

impl PredictedTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>, probability: f64) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(Error::Validation("tag key cannot be empty".into()));
        }
        if value.is_empty() {
            return Err(Error::Validation("tag value cannot be empty".into()));
        }
        validate_probability(probability)?;
        Ok(PredictedTag {
            key,
            value,
            probability,
        })
    }
}

/// Location of a sound event in time (seconds) and frequency (Hz).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub start_time: f64,
    pub low_freq: f64,
    pub end_time: f64,
    pub high_freq: f64,
}

impl BoundingBox {
    pub fn new(start_time: f64, low_freq: f64, end_time: f64, high_freq: f64) -> Result<Self> {
        if end_time <= start_time {
            return Err(Error::Validation(
                "end time must be greater than start time".into(),
            ));
        }
        if high_freq <= low_freq {
            return Err(Error::Validation(
                "high frequency must be greater than low frequency".into(),
            ));
        }
        Ok(BoundingBox {
            start_time,
            low_freq,
            end_time,
            high_freq,
        })
    }
}

/// A localized predicted event within a recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: Uuid,
    pub location: Option<BoundingBox>,
    pub probability: f64,
    pub tags: Vec<PredictedTag>,
}

impl Detection {
    pub fn new(
        location: Option<BoundingBox>,
        probability: f64,
        mut tags: Vec<PredictedTag>,
    ) -> Result<Self> {
        validate_probability(probability)?;
        sort_tags(&mut tags);
        Ok(Detection {
            id: Uuid::new_v4(),
            location,
            probability,
            tags,
        })
    }
}

/// The output of one model run over one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    pub id: Uuid,
    pub recording_id: Uuid,
    pub model_name: String,
    pub created_on: DateTime<Utc>,
    pub tags: Vec<PredictedTag>,
    pub detections: Vec<Detection>,
}

impl ModelOutput {
    pub fn new(
        recording_id: Uuid,
        model_name: impl Into<String>,
        tags: Vec<PredictedTag>,
        detections: Vec<Detection>,
    ) -> Self {
        let mut output = ModelOutput {
            id: Uuid::new_v4(),
            recording_id,
            model_name: model_name.into(),
            created_on: now_millis(),
            tags,
            detections,
        };
        output.normalize();
        output
    }

    /// Restore the deterministic ordering invariant after any mutation.
    pub fn normalize(&mut self) {
        sort_tags(&mut self.tags);
        for detection in &mut self.detections {
            sort_tags(&mut detection.tags);
        }
        self.detections.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then_with(|| b.id.cmp(&a.id))
        });
    }
}

/// A payload queued for delivery to the remote collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub content: String,
    pub created_on: DateTime<Utc>,
}

impl Message {
    pub fn new(content: String) -> Self {
        Message {
            id: Uuid::new_v4(),
            content,
            created_on: now_millis(),
        }
    }
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i64)]
pub enum ResponseStatus {
    Success = 0,
    Failed = 1,
    Error = 2,
    Timeout = 3,
}

impl ResponseStatus {
    pub fn from_i64(value: i64) -> Result<Self> {
        match value {
            0 => Ok(ResponseStatus::Success),
            1 => Ok(ResponseStatus::Failed),
            2 => Ok(ResponseStatus::Error),
            3 => Ok(ResponseStatus::Timeout),
            other => Err(Error::Validation(format!(
                "unknown response status {other}"
            ))),
        }
    }
}

/// The response received from (or synthesized for) one delivery attempt.
///
/// Carries the full message rather than just its id so that a response can
/// recreate a message row that was never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub message: Message,
    pub status: ResponseStatus,
    pub content: Option<String>,
    pub received_on: DateTime<Utc>,
}

impl Response {
    pub fn new(message: Message, status: ResponseStatus, content: Option<String>) -> Self {
        Response {
            message,
            status,
            content,
            received_on: now_millis(),
        }
    }
}

fn validate_probability(probability: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(Error::Validation(format!(
            "probability {probability} must be between 0 and 1"
        )));
    }
    Ok(())
}

fn sort_tags(tags: &mut [PredictedTag]) {
    tags.sort_by(compare_tags_desc);
}

fn compare_tags_desc(a: &PredictedTag, b: &PredictedTag) -> Ordering {
    b.probability
        .total_cmp(&a.probability)
        .then_with(|| b.key.cmp(&a.key))
        .then_with(|| b.value.cmp(&a.value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(key: &str, probability: f64) -> PredictedTag {
        PredictedTag::new(key, "value", probability).unwrap()
    }

    #[test]
    fn tags_sorted_by_probability_descending() {
        let output = ModelOutput::new(
            Uuid::new_v4(),
            "test-model",
            vec![tag("a", 0.4), tag("b", 0.9), tag("c", 0.6)],
            vec![],
        );
        let probabilities: Vec<f64> = output.tags.iter().map(|t| t.probability).collect();
        assert_eq!(probabilities, vec![0.9, 0.6, 0.4]);
    }

    #[test]
    fn tag_ties_broken_by_key_descending() {
        let output = ModelOutput::new(
            Uuid::new_v4(),
            "test-model",
            vec![tag("alpha", 0.5), tag("zulu", 0.5)],
            vec![],
        );
        assert_eq!(output.tags[0].key, "zulu");
        assert_eq!(output.tags[1].key, "alpha");
    }

    #[test]
    fn deployment_rejects_out_of_range_location() {
        assert!(Deployment::new("d".into(), Some(91.0), None).is_err());
        assert!(Deployment::new("d".into(), None, Some(-181.0)).is_err());
        assert!(Deployment::new("d".into(), Some(51.5), Some(-0.1)).is_ok());
    }

    #[test]
    fn recording_rejects_bad_fields() {
        let deployment = Uuid::new_v4();
        assert!(Recording::new(deployment, now_millis(), 0.0, 48_000, 1, None).is_err());
        assert!(Recording::new(deployment, now_millis(), 3.0, 0, 1, None).is_err());
        assert!(Recording::new(deployment, now_millis(), 3.0, 48_000, 0, None).is_err());
    }

    #[test]
    fn interval_contains_is_inclusive() {
        let interval = TimeInterval::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        );
        assert!(interval.contains(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        assert!(interval.contains(NaiveTime::from_hms_opt(17, 0, 0).unwrap()));
        assert!(!interval.contains(NaiveTime::from_hms_opt(17, 0, 1).unwrap()));
    }

    #[test]
    fn interval_wraps_over_midnight() {
        let interval = TimeInterval::new(
            NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
        );
        assert!(interval.contains(NaiveTime::from_hms_opt(23, 0, 0).unwrap()));
        assert!(interval.contains(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
        assert!(!interval.contains(NaiveTime::from_hms_opt(12, 0, 0).unwrap()));
    }
}
