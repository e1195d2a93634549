//! Task generators and the static task graph that binds them.
//!
//! Each task is constructed once with its dependencies and invoked repeatedly
//! by whatever schedules it. The graph is explicit: the recording task feeds
//! an ordered list of detection consumers; management and messaging run on
//! their own cadence, independent of capture.

pub mod detection;
pub mod heartbeat;
pub mod management;
pub mod messaging;
pub mod recording;

pub use detection::DetectionTask;
pub use heartbeat::HeartbeatTask;
pub use management::FileManagementTask;
pub use messaging::MessageSendTask;
pub use recording::RecordingTask;

use crate::error::Result;

/// A fully assembled pipeline.
pub struct Program {
    pub recording: RecordingTask,
    /// Consumers fed each captured recording, in order.
    pub detections: Vec<DetectionTask>,
    pub management: FileManagementTask,
    pub messaging: MessageSendTask,
    pub heartbeat: Option<HeartbeatTask>,
}

impl Program {
    /// Capture once and feed the result through every detection consumer.
    pub async fn run_recording_cycle(&self) -> Result<()> {
        let Some(recording) = self.recording.run().await? else {
            return Ok(());
        };
        for detection in &self.detections {
            detection.run(&recording).await?;
        }
        Ok(())
    }

    /// Run the self-checks of the recorder, every model and every messenger,
    /// failing on the first error.
    pub async fn check(&self) -> Result<()> {
        self.recording.check().await?;
        for detection in &self.detections {
            detection.check().await?;
        }
        self.messaging.check().await?;
        Ok(())
    }
}
