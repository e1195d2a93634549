use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use audio_sentinel::audio_recorder::CommandRecorder;
use audio_sentinel::conditions::IsInIntervals;
use audio_sentinel::config::{load_config, AppConfig};
use audio_sentinel::file_managers::DateFileManager;
use audio_sentinel::messengers::{HttpMessenger, MqttMessenger};
use audio_sentinel::outbox::SqliteMessageStore;
use audio_sentinel::saving_filters::{DutyCycleFilter, SaveIfInInterval, SavingThresholdFilter};
use audio_sentinel::store::SqliteStore;
use audio_sentinel::tasks::{
    FileManagementTask, HeartbeatTask, MessageSendTask, Program, RecordingTask,
};
use audio_sentinel::types::{FileManager, Messenger, RecordingCondition, SavingFilter};
use audio_sentinel::Result;

#[derive(Parser, Debug)]
#[command(name = "audio_sentinel", about = "Edge acoustic monitoring pipeline")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "audio_sentinel.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline until interrupted
    Run,
    /// Run the self-checks of the configured components and exit
    Check,
}

/// Assemble the pipeline from configuration.
///
/// The binary runs the basic program: capture, file management, messaging and
/// heartbeats. Detection consumers are wired by programs that carry a model.
async fn build_program(config: &AppConfig) -> Result<Program> {
    std::fs::create_dir_all(&config.data_dir)?;
    std::fs::create_dir_all(&config.tmp_dir)?;

    let store = SqliteStore::open(&config.data_dir.join("metadata.sqlite")).await?;
    let outbox = SqliteMessageStore::open(&config.data_dir.join("outbox.sqlite")).await?;

    let recorder = Arc::new(CommandRecorder::new(
        config.audio.device.clone(),
        config.audio.duration_s,
        config.audio.samplerate_hz,
        config.audio.channels,
        &config.tmp_dir,
    ));

    let mut conditions: Vec<Arc<dyn RecordingCondition>> = Vec::new();
    if !config.recording.intervals.is_empty() {
        let intervals = config
            .recording
            .intervals
            .iter()
            .map(|interval| interval.to_interval())
            .collect::<Result<Vec<_>>>()?;
        conditions.push(Arc::new(IsInIntervals::new(intervals)));
    }
    let recording = RecordingTask::new(store.clone(), recorder, conditions);

    let mut filters: Vec<Arc<dyn SavingFilter>> = Vec::new();
    if let Some(interval) = &config.saving.interval {
        filters.push(Arc::new(SaveIfInInterval::new(interval.to_interval()?)));
    }
    if let Some(duty) = &config.saving.duty_cycle {
        filters.push(Arc::new(DutyCycleFilter::new(
            duty.duration_min,
            duty.period_min,
        )?));
    }
    if let Some(threshold) = config.saving.threshold {
        filters.push(Arc::new(SavingThresholdFilter::new(threshold)));
    }
    let managers: Vec<Arc<dyn FileManager>> = vec![Arc::new(DateFileManager::new(
        config.data_dir.join("recordings"),
    ))];
    let management = FileManagementTask::new(
        store.clone(),
        filters,
        managers,
        Vec::new(),
        &config.tmp_dir,
    );

    let mut messengers: Vec<Arc<dyn Messenger>> = Vec::new();
    if let Some(http) = &config.messaging.http {
        messengers.push(Arc::new(HttpMessenger::new(
            &http.base_url,
            http.params.clone(),
            http.headers.clone(),
            Some(Duration::from_secs(http.timeout_s)),
        )?));
    }
    if let Some(mqtt) = &config.messaging.mqtt {
        messengers.push(Arc::new(MqttMessenger::new(
            &mqtt.host,
            mqtt.port,
            &mqtt.topic,
            &config.device_name,
            mqtt.username.clone(),
            mqtt.password.clone(),
            Some(Duration::from_secs(mqtt.timeout_s)),
        )));
    }
    let messaging = MessageSendTask::new(outbox.clone(), messengers.clone());

    let heartbeat = match config.messaging.heartbeat_interval_s {
        Some(_) => Some(HeartbeatTask::new(&config.device_name, messengers)?),
        None => None,
    };

    Ok(Program {
        recording,
        detections: Vec::new(),
        management,
        messaging,
        heartbeat,
    })
}

async fn run(config: AppConfig) -> Result<()> {
    let program = Arc::new(build_program(&config).await?);
    log::info!("pipeline assembled, starting task loops");

    {
        let program = program.clone();
        let cadence = Duration::from_secs(config.recording.cadence_s);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(cadence);
            loop {
                timer.tick().await;
                if let Err(err) = program.run_recording_cycle().await {
                    log::error!("recording cycle failed: {err}");
                }
            }
        });
    }

    {
        let program = program.clone();
        let cadence = Duration::from_secs(config.saving.management_interval_s);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(cadence);
            loop {
                timer.tick().await;
                if let Err(err) = program.management.run().await {
                    log::error!("file management failed: {err}");
                }
            }
        });
    }

    {
        let program = program.clone();
        let cadence = Duration::from_secs(config.messaging.send_interval_s);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(cadence);
            loop {
                timer.tick().await;
                if let Err(err) = program.messaging.run().await {
                    log::error!("message sending failed: {err}");
                }
            }
        });
    }

    if let Some(heartbeat_interval) = config.messaging.heartbeat_interval_s {
        let program = program.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(Duration::from_secs(heartbeat_interval));
            loop {
                timer.tick().await;
                if let Some(heartbeat) = &program.heartbeat {
                    if let Err(err) = heartbeat.run().await {
                        log::error!("heartbeat failed: {err}");
                    }
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    log::info!("interrupted, shutting down");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Command::Run => run(config).await,
        Command::Check => {
            let program = build_program(&config).await?;
            program.check().await?;
            println!("all component checks passed");
            Ok(())
        }
    }
}
