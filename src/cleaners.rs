//! Model output cleaners: pure transforms applied between the model and the
//! store, folded left over the configured list.

use crate::data::{Detection, ModelOutput, PredictedTag};
use crate::types::ModelOutputCleaner;

/// Keeps predictions with a probability at or above a threshold.
///
/// Drops low-confidence tags and detections, and strips low-confidence tags
/// nested inside detections that survive on their own score.
pub struct ThresholdCleaner {
    pub threshold: f64,
}

impl ThresholdCleaner {
    pub fn new(threshold: f64) -> Self {
        ThresholdCleaner { threshold }
    }

    fn clean_tags(&self, tags: Vec<PredictedTag>) -> Vec<PredictedTag> {
        tags.into_iter()
            .filter(|tag| tag.probability >= self.threshold)
            .collect()
    }

    fn clean_detections(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|detection| detection.probability >= self.threshold)
            .map(|detection| Detection {
                tags: self.clean_tags(detection.tags.clone()),
                ..detection
            })
            .collect()
    }
}

impl ModelOutputCleaner for ThresholdCleaner {
    fn clean(&self, output: ModelOutput) -> ModelOutput {
        let mut cleaned = ModelOutput {
            tags: self.clean_tags(output.tags),
            detections: self.clean_detections(output.detections),
            ..output
        };
        cleaned.normalize();
        cleaned
    }
}

/// Apply a list of cleaners in order.
pub fn apply_cleaners(
    cleaners: &[std::sync::Arc<dyn ModelOutputCleaner>],
    output: ModelOutput,
) -> ModelOutput {
    cleaners
        .iter()
        .fold(output, |output, cleaner| cleaner.clean(output))
}
