//! Heartbeat task: a liveness message on a fixed cadence, sent directly
//! rather than through the outbox.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::data::{now_millis, Message};
use crate::error::{Error, Result};
use crate::types::Messenger;

#[derive(Debug, Serialize)]
struct Heartbeat<'a> {
    device_id: &'a str,
    sent_on: DateTime<Utc>,
    status: &'a str,
}

pub struct HeartbeatTask {
    device_id: String,
    messengers: Vec<Arc<dyn Messenger>>,
}

impl HeartbeatTask {
    pub fn new(device_id: impl Into<String>, messengers: Vec<Arc<dyn Messenger>>) -> Result<Self> {
        if messengers.is_empty() {
            return Err(Error::Config(
                "at least one messenger is required to send heartbeats".into(),
            ));
        }
        Ok(HeartbeatTask {
            device_id: device_id.into(),
            messengers,
        })
    }

    pub async fn run(&self) -> Result<()> {
        let heartbeat = Heartbeat {
            device_id: &self.device_id,
            sent_on: now_millis(),
            status: "OK",
        };
        let message = Message::new(serde_json::to_string(&heartbeat)?);

        for messenger in &self.messengers {
            let response = messenger.send_message(&message).await;
            log::info!("heartbeat sent, response status {:?}", response.status);
        }
        Ok(())
    }
}
