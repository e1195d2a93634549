//! Message factories: build outbox payloads from model outputs.
//!
//! Factories filter what is worth sending; on a constrained uplink the
//! full-output factory is usually paired with an aggressive cleaner.

use crate::data::{Message, ModelOutput};
use crate::error::Result;
use crate::types::MessageFactory;

/// Serializes the whole model output as the message content.
pub struct FullModelOutputMessageFactory;

impl MessageFactory for FullModelOutputMessageFactory {
    fn build(&self, output: &ModelOutput) -> Result<Option<Message>> {
        let content = serde_json::to_string(output)?;
        Ok(Some(Message::new(content)))
    }
}

/// Sends only detections meeting a probability threshold that carry at least
/// one tag; produces nothing when no detection qualifies.
pub struct DetectionThresholdMessageFactory {
    pub threshold: f64,
}

impl DetectionThresholdMessageFactory {
    pub fn new(threshold: f64) -> Self {
        DetectionThresholdMessageFactory { threshold }
    }
}

impl MessageFactory for DetectionThresholdMessageFactory {
    fn build(&self, output: &ModelOutput) -> Result<Option<Message>> {
        let detections: Vec<_> = output
            .detections
            .iter()
            .filter(|d| d.probability >= self.threshold && !d.tags.is_empty())
            .cloned()
            .collect();
        if detections.is_empty() {
            return Ok(None);
        }

        let filtered = ModelOutput {
            detections,
            ..output.clone()
        };
        let content = serde_json::to_string(&filtered)?;
        Ok(Some(Message::new(content)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Detection, PredictedTag};
    use uuid::Uuid;

    fn output_with_detection(probability: f64) -> ModelOutput {
        let tags = vec![PredictedTag::new("species", "pipistrelle", probability).unwrap()];
        let detection = Detection::new(None, probability, tags).unwrap();
        ModelOutput::new(Uuid::new_v4(), "test-model", vec![], vec![detection])
    }

    #[test]
    fn full_output_round_trips_through_json() {
        let output = output_with_detection(0.9);
        let message = FullModelOutputMessageFactory.build(&output).unwrap().unwrap();
        let decoded: ModelOutput = serde_json::from_str(&message.content).unwrap();
        assert_eq!(decoded, output);
    }

    #[test]
    fn threshold_factory_skips_weak_outputs() {
        let factory = DetectionThresholdMessageFactory::new(0.6);
        assert!(factory.build(&output_with_detection(0.4)).unwrap().is_none());
        assert!(factory.build(&output_with_detection(0.9)).unwrap().is_some());
    }
}
