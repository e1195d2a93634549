//! Recording task: capture audio when the configured conditions allow it.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::data::{now_millis, Recording};
use crate::error::{Error, Result};
use crate::store::SqliteStore;
use crate::types::{AudioRecorder, RecordingCondition};

/// Captures one recording per invocation, gated by the recording conditions.
///
/// The capture device is exclusive: all clones of a task share one
/// single-permit semaphore so at most one capture is in flight, however the
/// external scheduler overlaps invocations.
pub struct RecordingTask {
    store: SqliteStore,
    recorder: Arc<dyn AudioRecorder>,
    conditions: Vec<Arc<dyn RecordingCondition>>,
    capture_lane: Arc<Semaphore>,
}

impl RecordingTask {
    pub fn new(
        store: SqliteStore,
        recorder: Arc<dyn AudioRecorder>,
        conditions: Vec<Arc<dyn RecordingCondition>>,
    ) -> Self {
        RecordingTask {
            store,
            recorder,
            conditions,
            capture_lane: Arc::new(Semaphore::new(1)),
        }
    }

    /// Returns the stored recording, or None when conditions said no.
    pub async fn run(&self) -> Result<Option<Recording>> {
        let now = now_millis();
        if !self
            .conditions
            .iter()
            .all(|condition| condition.should_record(now))
        {
            log::debug!("recording conditions not met, skipping capture");
            return Ok(None);
        }

        let deployment = self.store.get_current_deployment().await?;

        let _permit = self
            .capture_lane
            .acquire()
            .await
            .map_err(|_| Error::Resource("capture lane closed".into()))?;
        log::info!("recording audio for deployment {}", deployment.id);
        let recording = self.recorder.record(&deployment).await?;

        self.store.store_recording(&recording).await?;
        log::info!(
            "stored recording {} at {}",
            recording.id,
            recording.datetime
        );
        Ok(Some(recording))
    }

    pub async fn check(&self) -> Result<()> {
        self.recorder.check().await
    }
}
