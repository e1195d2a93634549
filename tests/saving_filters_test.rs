//! # Saving Filter Tests
//!
//! These tests verify the retention predicates applied by file management:
//! time windows (including windows wrapping midnight), duty cycles,
//! confidence thresholds, tag allow-lists and the solar-relative windows.

use chrono::{NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use audio_sentinel::data::{Detection, ModelOutput, PredictedTag, Recording, TimeInterval};
use audio_sentinel::saving_filters::{
    AfterDawnDuskFilter, BeforeDawnDuskFilter, DetectionTagsFilter, DutyCycleFilter,
    SaveIfInInterval, SavingThresholdFilter,
};
use audio_sentinel::types::SavingFilter;

fn recording_at(hour: u32, minute: u32) -> Recording {
    Recording::new(
        Uuid::new_v4(),
        Utc.with_ymd_and_hms(2024, 6, 1, hour, minute, 0).unwrap(),
        3.0,
        48_000,
        1,
        None,
    )
    .unwrap()
}

fn output_with_detection(probability: f64, key: &str, value: &str, tag_probability: f64) -> ModelOutput {
    let tags = vec![PredictedTag::new(key, value, tag_probability).unwrap()];
    let detection = Detection::new(None, probability, tags).unwrap();
    ModelOutput::new(Uuid::new_v4(), "test-model", vec![], vec![detection])
}

#[test]
fn night_window_accepts_2300_and_rejects_noon() {
    let filter = SaveIfInInterval::new(TimeInterval::new(
        NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
    ));

    assert!(filter.should_save(&recording_at(23, 0), &[]));
    assert!(filter.should_save(&recording_at(2, 0), &[]));
    assert!(!filter.should_save(&recording_at(12, 0), &[]));
}

#[test]
fn window_bounds_are_inclusive() {
    let filter = SaveIfInInterval::new(TimeInterval::new(
        NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
    ));

    assert!(filter.should_save(&recording_at(8, 0), &[]));
    assert!(filter.should_save(&recording_at(17, 0), &[]));
    assert!(!filter.should_save(&recording_at(7, 59), &[]));
}

#[test]
fn duty_cycle_keeps_the_first_minutes_of_each_period() {
    let filter = DutyCycleFilter::new(10, 30).unwrap();

    assert!(filter.should_save(&recording_at(14, 5), &[]));
    assert!(!filter.should_save(&recording_at(14, 15), &[]));
    // Second period of the hour: 30..40 saves again.
    assert!(filter.should_save(&recording_at(14, 35), &[]));
    assert!(!filter.should_save(&recording_at(14, 55), &[]));
}

#[test]
fn duty_cycle_rejects_bad_parameters() {
    assert!(DutyCycleFilter::new(10, 0).is_err());
    assert!(DutyCycleFilter::new(40, 30).is_err());
}

#[test]
fn threshold_filter_needs_one_confident_prediction() {
    let filter = SavingThresholdFilter::new(0.5);
    let recording = recording_at(1, 0);

    assert!(filter.should_save(&recording, &[output_with_detection(0.8, "species", "x", 0.2)]));
    assert!(!filter.should_save(&recording, &[output_with_detection(0.3, "species", "x", 0.2)]));
    // No outputs at all: nothing confident to keep.
    assert!(!filter.should_save(&recording, &[]));
}

#[test]
fn tag_allow_list_matches_key_value_and_score() {
    let filter = DetectionTagsFilter::new(
        vec![("species".into(), "pipistrellus".into())],
        0.5,
    );
    let recording = recording_at(1, 0);

    assert!(filter.should_save(
        &recording,
        &[output_with_detection(0.9, "species", "pipistrellus", 0.8)]
    ));
    // Wrong value
    assert!(!filter.should_save(
        &recording,
        &[output_with_detection(0.9, "species", "nyctalus", 0.8)]
    ));
    // Right tag, unconfident prediction
    assert!(!filter.should_save(
        &recording,
        &[output_with_detection(0.9, "species", "pipistrellus", 0.2)]
    ));
    // Right tag, unconfident detection
    assert!(!filter.should_save(
        &recording,
        &[output_with_detection(0.2, "species", "pipistrellus", 0.8)]
    ));
}

#[test]
fn after_dawn_window_follows_sunrise_at_the_equator() {
    // Sunrise at (0, 0) on the March equinox is a few minutes after 06:00 UTC.
    let filter = AfterDawnDuskFilter {
        minutes: 30,
        latitude: 0.0,
        longitude: 0.0,
    };
    let mut inside = recording_at(6, 20);
    inside.datetime = Utc.with_ymd_and_hms(2024, 3, 20, 6, 20, 0).unwrap();
    let mut outside = recording_at(12, 0);
    outside.datetime = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

    assert!(filter.should_save(&inside, &[]));
    assert!(!filter.should_save(&outside, &[]));
}

#[test]
fn before_dusk_window_precedes_sunset_at_the_equator() {
    let filter = BeforeDawnDuskFilter {
        minutes: 30,
        latitude: 0.0,
        longitude: 0.0,
    };
    let mut inside = recording_at(17, 50);
    inside.datetime = Utc.with_ymd_and_hms(2024, 3, 20, 17, 50, 0).unwrap();
    let mut outside = recording_at(12, 0);
    outside.datetime = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

    assert!(filter.should_save(&inside, &[]));
    assert!(!filter.should_save(&outside, &[]));
}

#[test]
fn solar_filters_reject_during_polar_night() {
    let filter = AfterDawnDuskFilter {
        minutes: 30,
        latitude: 78.0,
        longitude: 15.6,
    };
    let mut recording = recording_at(12, 0);
    recording.datetime = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
    assert!(!filter.should_save(&recording, &[]));
}
