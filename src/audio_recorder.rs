//! Audio capture via an external recorder binary.
//!
//! The capture driver itself is out of process: `arecord` (or any CLI with a
//! compatible argument shape) writes a WAV file into temporary storage and
//! this wrapper turns the result into recording metadata. The captured file
//! is named after the recording id so file management can resolve it later.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use uuid::Uuid;

use crate::data::{now_millis, Deployment, Recording};
use crate::error::{Error, Result};
use crate::types::AudioRecorder;

pub struct CommandRecorder {
    /// Capture binary, `arecord` by default.
    pub program: String,
    /// ALSA device name, e.g. `hw:1,0`. None uses the default device.
    pub device: Option<String>,
    pub duration: f64,
    pub samplerate: u32,
    pub channels: u16,
    pub tmp_dir: PathBuf,
}

impl CommandRecorder {
    pub fn new(
        device: Option<String>,
        duration: f64,
        samplerate: u32,
        channels: u16,
        tmp_dir: impl Into<PathBuf>,
    ) -> Self {
        CommandRecorder {
            program: "arecord".into(),
            device,
            duration,
            samplerate,
            channels,
            tmp_dir: tmp_dir.into(),
        }
    }

    fn capture_command(&self, path: &std::path::Path) -> Command {
        let mut command = Command::new(&self.program);
        if let Some(device) = &self.device {
            command.arg("-D").arg(device);
        }
        command
            .arg("-q")
            .arg("-f")
            .arg("S16_LE")
            .arg("-r")
            .arg(self.samplerate.to_string())
            .arg("-c")
            .arg(self.channels.to_string())
            .arg("-d")
            .arg((self.duration.ceil() as u64).to_string())
            .arg(path);
        command
    }
}

#[async_trait]
impl AudioRecorder for CommandRecorder {
    async fn record(&self, deployment: &Deployment) -> Result<Recording> {
        let id = Uuid::new_v4();
        let datetime = now_millis();
        let path = self.tmp_dir.join(format!("{id}.wav"));

        let status = self
            .capture_command(&path)
            .status()
            .await
            .map_err(|err| Error::Resource(format!("failed to run {}: {err}", self.program)))?;
        if !status.success() {
            return Err(Error::Resource(format!(
                "{} exited with {status}",
                self.program
            )));
        }

        // Read the actual format back from the file; a capture cut short
        // still yields valid metadata.
        let reader = hound::WavReader::open(&path)
            .map_err(|err| Error::Resource(format!("unreadable capture {}: {err}", path.display())))?;
        let spec = reader.spec();
        let frames = reader.duration();
        let duration = f64::from(frames) / f64::from(spec.sample_rate);
        if duration <= 0.0 {
            return Err(Error::Resource(format!(
                "capture {} is empty",
                path.display()
            )));
        }

        let mut recording = Recording::new(
            deployment.id,
            datetime,
            duration,
            spec.sample_rate,
            spec.channels,
            Some(path),
        )?;
        recording.id = id;
        Ok(recording)
    }

    async fn check(&self) -> Result<()> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map_err(|err| {
                Error::HealthCheck(format!("capture binary {} unavailable: {err}", self.program))
            })?;
        if !output.status.success() {
            return Err(Error::HealthCheck(format!(
                "{} --version exited with {}",
                self.program, output.status
            )));
        }
        Ok(())
    }
}
