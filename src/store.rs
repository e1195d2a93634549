//! Sqlite-backed store for deployments, recordings and model outputs.
//!
//! Every operation is scoped to its own transaction; callers must not assume
//! snapshot consistency across separate calls. Inserts are idempotent by id,
//! and duplicate unique keys degrade to get-or-create instead of surfacing as
//! raw storage errors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use crate::data::{
    millis_to_datetime, now_millis, BoundingBox, Deployment, Detection, ModelOutput, PredictedTag,
    Recording,
};
use crate::db;
use crate::error::{is_unique_violation, Error, Result};
use crate::queries::{deployments, model_outputs, recordings};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if necessary) the store at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::open_database(path).await?;
        db::init_metadata_schema(&pool).await?;
        Ok(SqliteStore { pool })
    }

    /// Wrap an already-initialized pool. The schema must exist.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    /// Get the deployment with the latest started_on.
    ///
    /// An empty store registers a fresh deployment with no location; a
    /// concurrent insert losing the unique race falls back to re-selecting.
    pub async fn get_current_deployment(&self) -> Result<Deployment> {
        let sql = deployments::select_latest();
        if let Some(row) = sqlx::query(&sql).fetch_optional(&self.pool).await? {
            return row_to_deployment(&row);
        }

        let now = now_millis();
        let name = format!("Deployment {}", now.format("%Y-%m-%d %H:%M:%S"));
        let deployment = Deployment::new(name, None, None)?;

        let sql = deployments::insert(
            &deployment.id.to_string(),
            &deployment.name,
            deployment.latitude,
            deployment.longitude,
            deployment.started_on.timestamp_millis(),
            None,
        );
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => Ok(deployment),
            Err(err) if is_unique_violation(&err) => {
                let sql = deployments::select_latest();
                let row = sqlx::query(&sql)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| Error::not_found("deployment", "latest"))?;
                row_to_deployment(&row)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Store a deployment. Storing the same id twice is a no-op.
    pub async fn store_deployment(&self, deployment: &Deployment) -> Result<()> {
        let sql = deployments::insert(
            &deployment.id.to_string(),
            &deployment.name,
            deployment.latitude,
            deployment.longitude,
            deployment.started_on.timestamp_millis(),
            deployment.ended_on.map(|dt| dt.timestamp_millis()),
        );
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => Ok(()),
            // A different id with the same started_on: the deployment is
            // already registered, treat as stored.
            Err(err) if is_unique_violation(&err) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Rewrite name, location and (if set) end time of an existing deployment.
    pub async fn update_deployment(&self, deployment: &Deployment) -> Result<()> {
        let sql = deployments::update(
            &deployment.id.to_string(),
            &deployment.name,
            deployment.latitude,
            deployment.longitude,
            deployment.ended_on.map(|dt| dt.timestamp_millis()),
        );
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("deployment", deployment.id));
        }
        Ok(())
    }

    /// Store a recording. Storing the same id twice is a no-op, and a
    /// duplicate capture datetime resolves to the already-stored row.
    pub async fn store_recording(&self, recording: &Recording) -> Result<()> {
        let sql = recordings::insert(
            &recording.id.to_string(),
            &recording.deployment_id.to_string(),
            recording.datetime.timestamp_millis(),
            recording.duration,
            recording.samplerate,
            recording.channels,
            recording.path.as_deref().map(path_str).as_deref(),
        );
        match sqlx::query(&sql).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                let sql = recordings::select_by_timestamp(recording.datetime.timestamp_millis());
                sqlx::query(&sql)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or_else(|| Error::not_found("recording", recording.id))?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Store a model output together with its detections and tags as one
    /// atomic unit. Any failure rolls the whole write back.
    pub async fn store_model_output(&self, output: &ModelOutput) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let sql = recordings::select_by_id(&output.recording_id.to_string());
        if sqlx::query(&sql).fetch_optional(&mut *tx).await?.is_none() {
            return Err(Error::not_found("recording", output.recording_id));
        }

        let output_id = output.id.to_string();
        let sql = model_outputs::insert(
            &output_id,
            &output.recording_id.to_string(),
            &output.model_name,
            output.created_on.timestamp_millis(),
        );
        sqlx::query(&sql).execute(&mut *tx).await?;

        for tag in &output.tags {
            let sql = model_outputs::insert_tag(
                Some(&output_id),
                None,
                &tag.key,
                &tag.value,
                tag.probability,
            );
            sqlx::query(&sql).execute(&mut *tx).await?;
        }

        for detection in &output.detections {
            let detection_id = detection.id.to_string();
            let location = match &detection.location {
                Some(location) => Some(serde_json::to_string(location)?),
                None => None,
            };
            let sql = model_outputs::insert_detection(
                &detection_id,
                &output_id,
                location.as_deref(),
                detection.probability,
            );
            sqlx::query(&sql).execute(&mut *tx).await?;

            for tag in &detection.tags {
                let sql = model_outputs::insert_tag(
                    None,
                    Some(&detection_id),
                    &tag.key,
                    &tag.value,
                    tag.probability,
                );
                sqlx::query(&sql).execute(&mut *tx).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Get recordings by id, each paired with its full list of model outputs,
    /// ordered by recording datetime descending.
    pub async fn get_recordings(
        &self,
        ids: &[Uuid],
    ) -> Result<Vec<(Recording, Vec<ModelOutput>)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_strings: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        let sql = recordings::select_by_ids(&id_strings);
        self.fetch_recordings_with_outputs(&sql).await
    }

    /// Get recordings by file path, each paired with its model outputs,
    /// ordered by recording datetime descending.
    pub async fn get_recordings_by_path(
        &self,
        paths: &[PathBuf],
    ) -> Result<Vec<(Recording, Vec<ModelOutput>)>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let path_strings: Vec<String> = paths.iter().map(|p| path_str(p)).collect();
        let sql = recordings::select_by_paths(&path_strings);
        self.fetch_recordings_with_outputs(&sql).await
    }

    /// Rewrite the stored path of an existing recording and return the
    /// updated value. `None` clears the path after the file was purged.
    pub async fn update_recording_path(
        &self,
        recording: &Recording,
        path: Option<&Path>,
    ) -> Result<Recording> {
        let sql = recordings::update_path(
            &recording.id.to_string(),
            path.map(path_str).as_deref(),
        );
        let result = sqlx::query(&sql).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::not_found("recording", recording.id));
        }
        let mut updated = recording.clone();
        updated.path = path.map(Path::to_path_buf);
        Ok(updated)
    }

    async fn fetch_recordings_with_outputs(
        &self,
        recordings_sql: &str,
    ) -> Result<Vec<(Recording, Vec<ModelOutput>)>> {
        let rows = sqlx::query(recordings_sql).fetch_all(&self.pool).await?;
        let recordings: Vec<Recording> = rows
            .iter()
            .map(row_to_recording)
            .collect::<Result<Vec<_>>>()?;
        if recordings.is_empty() {
            return Ok(Vec::new());
        }

        let recording_ids: Vec<String> = recordings.iter().map(|r| r.id.to_string()).collect();
        let sql = model_outputs::select_for_recordings(&recording_ids);
        let output_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        // Bare outputs keyed by id; detections and tags are attached below.
        let mut outputs: HashMap<String, ModelOutput> = HashMap::new();
        let mut outputs_by_recording: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in &output_rows {
            let id: String = row.try_get("id")?;
            let recording_id = parse_uuid(&row.try_get::<String, _>("recording_id")?)?;
            let output = ModelOutput {
                id: parse_uuid(&id)?,
                recording_id,
                model_name: row.try_get("model_name")?,
                created_on: millis_to_datetime(row.try_get("created_on_ms")?)?,
                tags: Vec::new(),
                detections: Vec::new(),
            };
            outputs_by_recording
                .entry(recording_id)
                .or_default()
                .push(id.clone());
            outputs.insert(id, output);
        }

        let output_ids: Vec<String> = outputs.keys().cloned().collect();
        let sql = model_outputs::select_detections_for_outputs(&output_ids);
        let detection_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut detections: HashMap<String, Detection> = HashMap::new();
        let mut detections_by_output: HashMap<String, Vec<String>> = HashMap::new();
        for row in &detection_rows {
            let id: String = row.try_get("id")?;
            let output_id: String = row.try_get("model_output_id")?;
            let location: Option<String> = row.try_get("location")?;
            let location: Option<BoundingBox> = match location {
                Some(text) => Some(serde_json::from_str(&text)?),
                None => None,
            };
            detections.insert(
                id.clone(),
                Detection {
                    id: parse_uuid(&id)?,
                    location,
                    probability: row.try_get("probability")?,
                    tags: Vec::new(),
                },
            );
            detections_by_output.entry(output_id).or_default().push(id);
        }

        let detection_ids: Vec<String> = detections.keys().cloned().collect();
        let sql = model_outputs::select_tags_for_outputs(&output_ids, &detection_ids);
        let tag_rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        for row in &tag_rows {
            let tag = PredictedTag {
                key: row.try_get("key")?,
                value: row.try_get("value")?,
                probability: row.try_get("probability")?,
            };
            let output_id: Option<String> = row.try_get("model_output_id")?;
            let detection_id: Option<String> = row.try_get("detection_id")?;
            if let Some(output_id) = output_id {
                if let Some(output) = outputs.get_mut(&output_id) {
                    output.tags.push(tag);
                }
            } else if let Some(detection_id) = detection_id {
                if let Some(detection) = detections.get_mut(&detection_id) {
                    detection.tags.push(tag);
                }
            }
        }

        for (output_id, detection_ids) in detections_by_output {
            if let Some(output) = outputs.get_mut(&output_id) {
                for detection_id in detection_ids {
                    if let Some(detection) = detections.remove(&detection_id) {
                        output.detections.push(detection);
                    }
                }
            }
        }

        let mut result = Vec::with_capacity(recordings.len());
        for recording in recordings {
            let mut recording_outputs = Vec::new();
            for output_id in outputs_by_recording.remove(&recording.id).unwrap_or_default() {
                if let Some(mut output) = outputs.remove(&output_id) {
                    output.normalize();
                    recording_outputs.push(output);
                }
            }
            // Newest output first, matching the query order lost by the maps.
            recording_outputs.sort_by(|a, b| {
                b.created_on
                    .cmp(&a.created_on)
                    .then_with(|| b.id.cmp(&a.id))
            });
            result.push((recording, recording_outputs));
        }
        Ok(result)
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|err| Error::Validation(format!("corrupt uuid {text}: {err}")))
}

fn row_to_deployment(row: &SqliteRow) -> Result<Deployment> {
    let ended_on_ms: Option<i64> = row.try_get("ended_on_ms")?;
    Ok(Deployment {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        started_on: millis_to_datetime(row.try_get("started_on_ms")?)?,
        ended_on: ended_on_ms.map(millis_to_datetime).transpose()?,
    })
}

fn row_to_recording(row: &SqliteRow) -> Result<Recording> {
    let samplerate: i64 = row.try_get("samplerate_hz")?;
    let channels: i64 = row.try_get("audio_channels")?;
    let path: Option<String> = row.try_get("path")?;
    Ok(Recording {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        deployment_id: parse_uuid(&row.try_get::<String, _>("deployment_id")?)?,
        datetime: millis_to_datetime(row.try_get("timestamp_ms")?)?,
        duration: row.try_get("duration_s")?,
        samplerate: samplerate as u32,
        channels: channels as u16,
        path: path.map(PathBuf::from),
    })
}
