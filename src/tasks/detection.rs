//! Detection task: run the model over a recording, clean the output, persist
//! it, and enqueue any messages the factories produce.

use std::sync::Arc;

use crate::cleaners::apply_cleaners;
use crate::data::{ModelOutput, Recording};
use crate::error::Result;
use crate::outbox::SqliteMessageStore;
use crate::store::SqliteStore;
use crate::types::{MessageFactory, Model, ModelOutputCleaner, ProcessingFilter};

/// Runs detection over one recording per invocation.
///
/// Re-running the task on the same recording persists an additional model
/// output; deduplication is left to the collector, which must already
/// tolerate at-least-once message delivery.
pub struct DetectionTask {
    store: SqliteStore,
    outbox: SqliteMessageStore,
    model: Arc<dyn Model>,
    processing_filters: Vec<Arc<dyn ProcessingFilter>>,
    cleaners: Vec<Arc<dyn ModelOutputCleaner>>,
    message_factories: Vec<Arc<dyn MessageFactory>>,
}

impl DetectionTask {
    pub fn new(
        store: SqliteStore,
        outbox: SqliteMessageStore,
        model: Arc<dyn Model>,
        processing_filters: Vec<Arc<dyn ProcessingFilter>>,
        cleaners: Vec<Arc<dyn ModelOutputCleaner>>,
        message_factories: Vec<Arc<dyn MessageFactory>>,
    ) -> Self {
        DetectionTask {
            store,
            outbox,
            model,
            processing_filters,
            cleaners,
            message_factories,
        }
    }

    /// Returns the persisted output, or None when a processing filter
    /// rejected the recording.
    pub async fn run(&self, recording: &Recording) -> Result<Option<ModelOutput>> {
        if !self
            .processing_filters
            .iter()
            .all(|filter| filter.should_process(recording))
        {
            log::info!("recording {} rejected by processing filters", recording.id);
            return Ok(None);
        }

        log::info!("running model on recording {}", recording.id);
        let output = self.model.run(recording).await?;
        let output = apply_cleaners(&self.cleaners, output);

        self.store.store_model_output(&output).await?;

        for factory in &self.message_factories {
            if let Some(message) = factory.build(&output)? {
                self.outbox.store_message(&message).await?;
                log::info!("queued message {} for output {}", message.id, output.id);
            }
        }

        Ok(Some(output))
    }

    pub async fn check(&self) -> Result<()> {
        self.model.check().await
    }
}
