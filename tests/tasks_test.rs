//! # Task Tests
//!
//! End-to-end exercises of the task generators with stub components:
//! capture -> detection -> outbox, file management delete/relocate, and
//! outbox draining with persisted responses.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use audio_sentinel::cleaners::ThresholdCleaner;
use audio_sentinel::data::{
    now_millis, Deployment, Detection, Message, ModelOutput, PredictedTag, Recording, Response,
    ResponseStatus, TimeInterval,
};
use audio_sentinel::message_factories::FullModelOutputMessageFactory;
use audio_sentinel::outbox::SqliteMessageStore;
use audio_sentinel::saving_filters::SaveIfInInterval;
use audio_sentinel::store::SqliteStore;
use audio_sentinel::tasks::{
    DetectionTask, FileManagementTask, HeartbeatTask, MessageSendTask, RecordingTask,
};
use audio_sentinel::types::{
    AudioRecorder, FileManager, Messenger, Model, RecordingCondition, SavingFilter,
};
use audio_sentinel::file_managers::IdFileManager;
use audio_sentinel::Result;

/// Helper to create both stores in one temporary directory
async fn create_test_stores() -> (SqliteStore, SqliteMessageStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("metadata.sqlite"))
        .await
        .unwrap();
    let outbox = SqliteMessageStore::open(&dir.path().join("outbox.sqlite"))
        .await
        .unwrap();
    (store, outbox, dir)
}

/// Helper to write a short valid WAV file
fn write_wav(path: &Path) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 48_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..4_800 {
        writer.write_sample(0i16).unwrap();
    }
    writer.finalize().unwrap();
}

/// Recorder stub that writes a real WAV file into the temp dir
struct StubRecorder {
    tmp_dir: PathBuf,
}

#[async_trait]
impl AudioRecorder for StubRecorder {
    async fn record(&self, deployment: &Deployment) -> Result<Recording> {
        let recording = Recording::new(deployment.id, now_millis(), 0.1, 48_000, 1, None)?;
        let path = self.tmp_dir.join(format!("{}.wav", recording.id));
        write_wav(&path);
        Ok(Recording {
            path: Some(path),
            ..recording
        })
    }
}

/// Model stub returning one detection at a fixed probability with one tag
struct StubModel {
    probability: f64,
}

#[async_trait]
impl Model for StubModel {
    async fn run(&self, recording: &Recording) -> Result<ModelOutput> {
        let tags = vec![PredictedTag::new("species", "pipistrellus", self.probability)?];
        let detection = Detection::new(None, self.probability, tags)?;
        Ok(ModelOutput::new(
            recording.id,
            "stub-model",
            vec![],
            vec![detection],
        ))
    }
}

/// Condition stub that never allows recording
struct Never;

impl RecordingCondition for Never {
    fn should_record(&self, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Messenger stub answering every send with a fixed status
struct StubMessenger {
    status: ResponseStatus,
    sent: Mutex<Vec<Message>>,
}

impl StubMessenger {
    fn new(status: ResponseStatus) -> Self {
        StubMessenger {
            status,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Messenger for StubMessenger {
    async fn send_message(&self, message: &Message) -> Response {
        self.sent.lock().unwrap().push(message.clone());
        Response::new(message.clone(), self.status, Some("stub".into()))
    }
}

fn night_filter() -> Arc<dyn SavingFilter> {
    Arc::new(SaveIfInInterval::new(TimeInterval::new(
        chrono::NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        chrono::NaiveTime::from_hms_opt(4, 0, 0).unwrap(),
    )))
}

/// Store a recording whose file lives in `tmp` and whose capture time is the
/// given hour on 2024-06-01.
async fn seed_recording(store: &SqliteStore, tmp: &Path, hour: u32) -> Recording {
    let deployment = store.get_current_deployment().await.unwrap();
    let id = Uuid::new_v4();
    let path = tmp.join(format!("{id}.wav"));
    write_wav(&path);
    let mut recording = Recording::new(
        deployment.id,
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
        0.1,
        48_000,
        1,
        Some(path),
    )
    .unwrap();
    recording.id = id;
    store.store_recording(&recording).await.unwrap();
    recording
}

#[tokio::test]
async fn end_to_end_capture_detect_and_enqueue() {
    let (store, outbox, dir) = create_test_stores().await;
    let tmp = dir.path().join("tmp");
    std::fs::create_dir_all(&tmp).unwrap();

    let recording_task = RecordingTask::new(
        store.clone(),
        Arc::new(StubRecorder {
            tmp_dir: tmp.clone(),
        }),
        vec![],
    );
    let recording = recording_task.run().await.unwrap().expect("captured");
    assert!(recording.path.as_ref().unwrap().is_file());

    let detection_task = DetectionTask::new(
        store.clone(),
        outbox.clone(),
        Arc::new(StubModel { probability: 0.9 }),
        vec![],
        vec![Arc::new(ThresholdCleaner::new(0.2))],
        vec![Arc::new(FullModelOutputMessageFactory)],
    );
    let output = detection_task
        .run(&recording)
        .await
        .unwrap()
        .expect("processed");

    // Exactly one output with exactly one detection was persisted.
    let rows = store.get_recordings(&[recording.id]).await.unwrap();
    assert_eq!(rows.len(), 1);
    let (_, outputs) = &rows[0];
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].detections.len(), 1);
    assert_eq!(outputs[0].detections[0].probability, 0.9);

    // Exactly one message whose content reconstructs the persisted output.
    let unsent = outbox.get_unsent_messages().await.unwrap();
    assert_eq!(unsent.len(), 1);
    let decoded: ModelOutput = serde_json::from_str(&unsent[0].content).unwrap();
    assert_eq!(decoded, output);
    assert_eq!(&decoded, &outputs[0]);
}

#[tokio::test]
async fn recording_task_skips_when_conditions_fail() {
    let (store, _outbox, dir) = create_test_stores().await;
    let tmp = dir.path().join("tmp");
    std::fs::create_dir_all(&tmp).unwrap();

    let task = RecordingTask::new(
        store.clone(),
        Arc::new(StubRecorder { tmp_dir: tmp }),
        vec![Arc::new(Never)],
    );
    assert!(task.run().await.unwrap().is_none());
}

#[tokio::test]
async fn detection_below_cleaner_threshold_yields_empty_output() {
    let (store, outbox, dir) = create_test_stores().await;
    let tmp = dir.path().join("tmp");
    std::fs::create_dir_all(&tmp).unwrap();
    let recording = seed_recording(&store, &tmp, 23).await;

    let detection_task = DetectionTask::new(
        store.clone(),
        outbox.clone(),
        Arc::new(StubModel { probability: 0.1 }),
        vec![],
        vec![Arc::new(ThresholdCleaner::new(0.5))],
        vec![Arc::new(FullModelOutputMessageFactory)],
    );
    let output = detection_task.run(&recording).await.unwrap().unwrap();
    assert!(output.detections.is_empty());

    let rows = store.get_recordings(&[recording.id]).await.unwrap();
    assert!(rows[0].1[0].detections.is_empty());
}

#[tokio::test]
async fn management_deletes_rejected_and_relocates_accepted() {
    let (store, _outbox, dir) = create_test_stores().await;
    let tmp = dir.path().join("tmp");
    let saved_dir = dir.path().join("saved");
    std::fs::create_dir_all(&tmp).unwrap();

    let night = seed_recording(&store, &tmp, 23).await;
    let noon = seed_recording(&store, &tmp, 12).await;

    let task = FileManagementTask::new(
        store.clone(),
        vec![night_filter()],
        vec![Arc::new(IdFileManager::new(saved_dir.clone()))],
        vec![],
        &tmp,
    );
    task.run().await.unwrap();

    // The noon capture was rejected: file gone, row kept, path cleared.
    assert!(!noon.path.as_ref().unwrap().exists());
    let rows = store.get_recordings(&[noon.id]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].0.path.is_none());

    // The night capture moved into permanent storage.
    let moved = saved_dir.join(format!("{}.wav", night.id));
    assert!(moved.is_file());
    assert!(!night.path.as_ref().unwrap().exists());
    let rows = store.get_recordings(&[night.id]).await.unwrap();
    assert_eq!(rows[0].0.path.as_deref(), Some(moved.as_path()));
}

#[tokio::test]
async fn management_leaves_files_without_metadata_alone() {
    let (store, _outbox, dir) = create_test_stores().await;
    let tmp = dir.path().join("tmp");
    std::fs::create_dir_all(&tmp).unwrap();

    let stray = tmp.join(format!("{}.wav", Uuid::new_v4()));
    write_wav(&stray);

    let task = FileManagementTask::new(store.clone(), vec![night_filter()], vec![], vec![], &tmp);
    task.run().await.unwrap();

    assert!(stray.is_file());
}

#[tokio::test]
async fn management_waits_for_required_model_outputs() {
    let (store, _outbox, dir) = create_test_stores().await;
    let tmp = dir.path().join("tmp");
    std::fs::create_dir_all(&tmp).unwrap();

    let recording = seed_recording(&store, &tmp, 23).await;

    let task = FileManagementTask::new(
        store.clone(),
        vec![night_filter()],
        vec![],
        vec!["stub-model".into()],
        &tmp,
    );
    task.run().await.unwrap();

    // No stub-model output yet: the file must be neither moved nor deleted.
    assert!(recording.path.as_ref().unwrap().is_file());
    let rows = store.get_recordings(&[recording.id]).await.unwrap();
    assert_eq!(rows[0].0.path, recording.path);
}

#[tokio::test]
async fn send_task_drains_outbox_and_persists_responses() {
    let (_store, outbox, _dir) = create_test_stores().await;

    let message = Message::new("{\"detections\":[]}".into());
    outbox.store_message(&message).await.unwrap();

    let failing = Arc::new(StubMessenger::new(ResponseStatus::Failed));
    let task = MessageSendTask::new(outbox.clone(), vec![failing.clone()]);
    task.run().await.unwrap();

    // Failure persisted, message still eligible.
    assert_eq!(outbox.get_unsent_messages().await.unwrap().len(), 1);
    assert_eq!(outbox.get_responses(message.id).await.unwrap().len(), 1);

    let succeeding = Arc::new(StubMessenger::new(ResponseStatus::Success));
    let task = MessageSendTask::new(outbox.clone(), vec![succeeding.clone()]);
    task.run().await.unwrap();

    assert!(outbox.get_unsent_messages().await.unwrap().is_empty());
    assert_eq!(outbox.get_responses(message.id).await.unwrap().len(), 2);

    // Re-running against a drained outbox sends nothing.
    task.run().await.unwrap();
    assert_eq!(succeeding.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn heartbeat_reaches_every_messenger() {
    let first = Arc::new(StubMessenger::new(ResponseStatus::Success));
    let second = Arc::new(StubMessenger::new(ResponseStatus::Failed));

    let task = HeartbeatTask::new("sensor-01", vec![first.clone(), second.clone()]).unwrap();
    task.run().await.unwrap();

    let sent = first.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].content.contains("\"device_id\":\"sensor-01\""));
    assert_eq!(second.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn heartbeat_requires_a_messenger() {
    assert!(HeartbeatTask::new("sensor-01", vec![]).is_err());
}
