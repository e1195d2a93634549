use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{DEFAULT_MQTT_PORT, DEFAULT_SEND_TIMEOUT_SECS, DEFAULT_TEMP_PATH};
use crate::data::TimeInterval;
use crate::conditions::parse_time;
use crate::error::{Error, Result};

/// Time window in "HH:MM" notation, both bounds inclusive. Start after end
/// denotes a window wrapping over midnight.
#[derive(Debug, Clone, Deserialize)]
pub struct IntervalConfig {
    pub start: String,
    pub end: String,
}

impl IntervalConfig {
    pub fn to_interval(&self) -> Result<TimeInterval> {
        Ok(TimeInterval::new(
            parse_time(&self.start)?,
            parse_time(&self.end)?,
        ))
    }
}

/// Capture parameters handed to the recorder
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// ALSA device name (default device if omitted)
    pub device: Option<String>,
    /// Length of each capture in seconds
    pub duration_s: f64,
    pub samplerate_hz: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
}

fn default_channels() -> u16 {
    1
}

/// When and how often to record
#[derive(Debug, Clone, Deserialize)]
pub struct RecordingConfig {
    /// Recording windows (UTC). Empty means record around the clock.
    #[serde(default)]
    pub intervals: Vec<IntervalConfig>,
    /// Seconds between capture attempts
    pub cadence_s: u64,
}

/// Which recordings are worth keeping
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavingConfig {
    /// Keep only recordings inside this window (UTC)
    pub interval: Option<IntervalConfig>,
    pub duty_cycle: Option<DutyCycleConfig>,
    /// Keep only recordings with a tag or detection at or above this score
    pub threshold: Option<f64>,
    /// Seconds between file management sweeps
    #[serde(default = "default_management_interval")]
    pub management_interval_s: u64,
}

fn default_management_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct DutyCycleConfig {
    pub duration_min: u32,
    pub period_min: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagingConfig {
    pub http: Option<HttpConfig>,
    pub mqtt: Option<MqttConfig>,
    /// Seconds between outbox drains
    #[serde(default = "default_send_interval")]
    pub send_interval_s: u64,
    /// Heartbeat cadence in seconds; no heartbeats when omitted
    pub heartbeat_interval_s: Option<u64>,
}

fn default_send_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub base_url: String,
    #[serde(default)]
    pub params: Vec<(String, String)>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default = "default_timeout")]
    pub timeout_s: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default = "default_mqtt_port")]
    pub port: u16,
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_s: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_SEND_TIMEOUT_SECS
}

fn default_mqtt_port() -> u16 {
    DEFAULT_MQTT_PORT
}

/// Top-level configuration file structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Name reported in heartbeats and used as the MQTT client id
    pub device_name: String,
    /// Directory holding the sqlite stores and saved recordings
    pub data_dir: PathBuf,
    /// Temporary capture storage
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
    pub audio: AudioConfig,
    pub recording: RecordingConfig,
    #[serde(default)]
    pub saving: SavingConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TEMP_PATH)
}

impl AppConfig {
    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(Error::Config("device_name cannot be empty".into()));
        }
        if self.audio.duration_s <= 0.0 {
            return Err(Error::Config("audio.duration_s must be positive".into()));
        }
        if self.audio.samplerate_hz == 0 {
            return Err(Error::Config("audio.samplerate_hz must be positive".into()));
        }
        if self.audio.channels == 0 {
            return Err(Error::Config("audio.channels must be at least 1".into()));
        }
        if self.recording.cadence_s == 0 {
            return Err(Error::Config("recording.cadence_s must be positive".into()));
        }
        for interval in self
            .recording
            .intervals
            .iter()
            .chain(self.saving.interval.iter())
        {
            interval.to_interval()?;
        }
        if let Some(duty) = &self.saving.duty_cycle {
            if duty.period_min == 0 || duty.duration_min > duty.period_min {
                return Err(Error::Config(format!(
                    "invalid duty cycle {}min of {}min",
                    duty.duration_min, duty.period_min
                )));
            }
        }
        if let Some(threshold) = self.saving.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::Config(format!(
                    "saving.threshold {threshold} must be between 0 and 1"
                )));
            }
        }
        if self.messaging.heartbeat_interval_s.is_some()
            && self.messaging.http.is_none()
            && self.messaging.mqtt.is_none()
        {
            return Err(Error::Config(
                "heartbeats require at least one messenger".into(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a TOML configuration file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let text = std::fs::read_to_string(path)?;
    let config: AppConfig =
        toml::from_str(&text).map_err(|err| Error::Config(format!("{}: {err}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
device_name = "sensor-01"
data_dir = "/var/lib/audio_sentinel"

[audio]
duration_s = 3.0
samplerate_hz = 192000

[recording]
cadence_s = 10
intervals = [{ start = "21:00", end = "05:00" }]

[saving]
threshold = 0.4

[messaging.http]
base_url = "https://collector.example.org/api/detections"
"#;

    #[test]
    fn minimal_config_parses_and_validates() {
        let config: AppConfig = toml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();
        assert_eq!(config.audio.channels, 1);
        assert_eq!(config.tmp_dir, PathBuf::from(DEFAULT_TEMP_PATH));
        assert_eq!(config.messaging.send_interval_s, 30);
    }

    #[test]
    fn bad_interval_is_a_configuration_error() {
        let mut config: AppConfig = toml::from_str(MINIMAL).unwrap();
        config.recording.intervals[0].start = "25:00".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn heartbeat_without_messenger_is_rejected() {
        let mut config: AppConfig = toml::from_str(MINIMAL).unwrap();
        config.messaging.http = None;
        config.messaging.heartbeat_interval_s = Some(600);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
