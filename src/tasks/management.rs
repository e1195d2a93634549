//! File management task: resolve temp-captured audio against the store and
//! either move it to permanent storage or delete it.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::file_managers::{delete_recording_file, get_temp_files};
use crate::store::SqliteStore;
use crate::types::{FileManager, SavingFilter};
use crate::error::Result;

/// Applies the saving-filter chain to every temp-tracked recording.
///
/// May race with detection on the same recording: when management runs first,
/// the file is judged without that output's influence and, if kept, simply
/// gets judged again next cycle. Files are only removed, never corrupted.
pub struct FileManagementTask {
    store: SqliteStore,
    filters: Vec<Arc<dyn SavingFilter>>,
    managers: Vec<Arc<dyn FileManager>>,
    /// Model names whose outputs must exist before a recording is judged.
    required_models: Vec<String>,
    tmp_dir: PathBuf,
}

impl FileManagementTask {
    pub fn new(
        store: SqliteStore,
        filters: Vec<Arc<dyn SavingFilter>>,
        managers: Vec<Arc<dyn FileManager>>,
        required_models: Vec<String>,
        tmp_dir: impl Into<PathBuf>,
    ) -> Self {
        FileManagementTask {
            store,
            filters,
            managers,
            required_models,
            tmp_dir: tmp_dir.into(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let temp_files = get_temp_files(&self.tmp_dir)?;
        if temp_files.is_empty() {
            return Ok(());
        }

        let resolved = self.store.get_recordings_by_path(&temp_files).await?;

        // A temp file with no recording row means capture metadata was never
        // persisted. That is an error to surface, not a file to delete.
        let known: HashSet<&PathBuf> = resolved
            .iter()
            .filter_map(|(recording, _)| recording.path.as_ref())
            .collect();
        for path in &temp_files {
            if !known.contains(path) {
                log::error!(
                    "temp file {} has no recording metadata, leaving in place",
                    path.display()
                );
            }
        }

        for (recording, outputs) in resolved {
            let Some(path) = recording.path.clone() else {
                continue;
            };

            // Not ready until every required model has reported.
            let missing = self
                .required_models
                .iter()
                .any(|name| !outputs.iter().any(|output| &output.model_name == name));
            if missing {
                log::info!(
                    "recording {} is missing required model outputs, skipping",
                    recording.id
                );
                continue;
            }

            if !self
                .filters
                .iter()
                .all(|filter| filter.should_save(&recording, &outputs))
            {
                log::info!("recording {} did not pass saving filters", recording.id);
                delete_recording_file(&recording)?;
                self.store.update_recording_path(&recording, None).await?;
                continue;
            }

            if !path.exists() {
                log::error!(
                    "recording {} file {} has already been removed",
                    recording.id,
                    path.display()
                );
                continue;
            }

            let mut saved = None;
            for manager in &self.managers {
                match manager.save(&recording, &outputs) {
                    Ok(new_path) => {
                        saved = Some(new_path);
                        break;
                    }
                    Err(err) => {
                        log::warn!(
                            "file manager failed to save recording {}: {err}",
                            recording.id
                        );
                    }
                }
            }

            match saved {
                Some(new_path) => {
                    self.store
                        .update_recording_path(&recording, Some(&new_path))
                        .await?;
                    log::info!("saved recording {} to {}", recording.id, new_path.display());
                }
                None => {
                    log::warn!("no file manager was able to save recording {}", recording.id);
                }
            }
        }

        Ok(())
    }
}
