//! Component interfaces, one per capability.
//!
//! The pipeline is assembled from trait objects at startup; tasks never know
//! which concrete recorder, model, filter or messenger they were given.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::data::{Deployment, Message, ModelOutput, Recording, Response};
use crate::error::Result;

/// Captures audio for the given deployment and returns the recording
/// metadata, with `path` pointing at the temporary file.
#[async_trait]
pub trait AudioRecorder: Send + Sync {
    async fn record(&self, deployment: &Deployment) -> Result<Recording>;

    /// Self-test hook run by `Program::check`.
    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Runs a detection model over a recording.
#[async_trait]
pub trait Model: Send + Sync {
    async fn run(&self, recording: &Recording) -> Result<ModelOutput>;

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Decides whether a recording should be made at a given instant.
pub trait RecordingCondition: Send + Sync {
    fn should_record(&self, now: DateTime<Utc>) -> bool;
}

/// Decides how long to wait before the next capture attempt.
pub trait RecordingScheduler: Send + Sync {
    /// Zero when a recording should happen immediately, otherwise the time
    /// until the next configured boundary.
    fn time_until_next(&self, now: DateTime<Utc>) -> Duration;
}

/// Cheap pre-screen run before the model, e.g. to skip silent recordings.
pub trait ProcessingFilter: Send + Sync {
    fn should_process(&self, recording: &Recording) -> bool;
}

/// A pure `ModelOutput -> ModelOutput` transform; a configured list of
/// cleaners is applied as a left fold.
pub trait ModelOutputCleaner: Send + Sync {
    fn clean(&self, output: ModelOutput) -> ModelOutput;
}

/// Builds a message from a model output, or nothing when the output is not
/// worth sending.
pub trait MessageFactory: Send + Sync {
    fn build(&self, output: &ModelOutput) -> Result<Option<Message>>;
}

/// A retention predicate over a recording and its persisted model outputs.
/// The configured list combines by AND.
pub trait SavingFilter: Send + Sync {
    fn should_save(&self, recording: &Recording, outputs: &[ModelOutput]) -> bool;
}

/// Moves a recording's file into permanent storage and returns the new path.
pub trait FileManager: Send + Sync {
    fn save(&self, recording: &Recording, outputs: &[ModelOutput]) -> Result<PathBuf>;
}

/// Delivers a message to the remote collector.
///
/// Failures are encoded in the returned response status rather than an error:
/// the response is persisted either way and a non-success status keeps the
/// message eligible for retry.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, message: &Message) -> Response;

    async fn check(&self) -> Result<()> {
        Ok(())
    }
}
