//! File managers and the plumbing for moving captured audio between
//! temporary and permanent storage.
//!
//! Temporary files live on tmpfs and permanent storage is usually an SD card
//! or external drive, so a plain rename can fail with a cross-device error;
//! moves fall back to copy-and-remove.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike};

use crate::data::{ModelOutput, Recording};
use crate::error::{Error, Result};
use crate::types::FileManager;

/// List the `*.wav` files currently in temporary storage.
pub fn get_temp_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "wav") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Delete the audio file behind a recording. The store row is not touched.
pub fn delete_recording_file(recording: &Recording) -> Result<()> {
    let path = recording
        .path
        .as_deref()
        .ok_or_else(|| Error::Resource(format!("recording {} has no path", recording.id)))?;
    fs::remove_file(path)?;
    log::debug!("deleted recording file {}", path.display());
    Ok(())
}

/// Move a file, creating the destination directory and falling back to
/// copy-and-remove across filesystems.
pub fn move_recording_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    if fs::rename(src, dest).is_err() {
        fs::copy(src, dest)?;
        fs::remove_file(src)?;
    }
    log::debug!("moved {} to {}", src.display(), dest.display());
    Ok(())
}

fn save_under(directory: &Path, relative: &Path, recording: &Recording) -> Result<PathBuf> {
    let src = recording
        .path
        .as_deref()
        .ok_or_else(|| Error::Resource(format!("recording {} has no path", recording.id)))?;
    if !src.is_file() {
        return Err(Error::Resource(format!(
            "recording file {} does not exist",
            src.display()
        )));
    }
    let dest = directory.join(relative);
    move_recording_file(src, &dest)?;
    Ok(dest)
}

/// Organizes recordings into date directories:
/// `YYYY/MM/DD/HHMMSS_<id>.wav`.
pub struct DateFileManager {
    pub directory: PathBuf,
}

impl DateFileManager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        DateFileManager {
            directory: directory.into(),
        }
    }
}

impl FileManager for DateFileManager {
    fn save(&self, recording: &Recording, _outputs: &[ModelOutput]) -> Result<PathBuf> {
        let date = recording.datetime;
        let relative = PathBuf::from(format!(
            "{:04}/{:02}/{:02}/{:02}{:02}{:02}_{}.wav",
            date.year(),
            date.month(),
            date.day(),
            date.hour(),
            date.minute(),
            date.second(),
            recording.id
        ));
        save_under(&self.directory, &relative, recording)
    }
}

/// Stores every recording flat, named by its id: `<id>.wav`.
pub struct IdFileManager {
    pub directory: PathBuf,
}

impl IdFileManager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        IdFileManager {
            directory: directory.into(),
        }
    }
}

impl FileManager for IdFileManager {
    fn save(&self, recording: &Recording, _outputs: &[ModelOutput]) -> Result<PathBuf> {
        let relative = PathBuf::from(format!("{}.wav", recording.id));
        save_under(&self.directory, &relative, recording)
    }
}
