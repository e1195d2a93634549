//! Messaging task: drain the outbox through every configured messenger.

use std::sync::Arc;

use crate::error::Result;
use crate::outbox::SqliteMessageStore;
use crate::types::Messenger;

/// Sends every unsent message and persists every response. Safe to re-run
/// arbitrarily; a message stays unsent until a success response lands.
pub struct MessageSendTask {
    outbox: SqliteMessageStore,
    messengers: Vec<Arc<dyn Messenger>>,
}

impl MessageSendTask {
    pub fn new(outbox: SqliteMessageStore, messengers: Vec<Arc<dyn Messenger>>) -> Self {
        MessageSendTask { outbox, messengers }
    }

    pub async fn run(&self) -> Result<()> {
        if self.messengers.is_empty() {
            log::debug!("no messengers configured, leaving outbox untouched");
            return Ok(());
        }

        let messages = self.outbox.get_unsent_messages().await?;
        if messages.is_empty() {
            return Ok(());
        }
        log::info!("sending {} unsent messages", messages.len());

        for message in &messages {
            for messenger in &self.messengers {
                let response = messenger.send_message(message).await;
                log::info!(
                    "message {} sent, response status {:?}",
                    message.id,
                    response.status
                );
                self.outbox.store_response(&response).await?;
            }
        }
        Ok(())
    }

    pub async fn check(&self) -> Result<()> {
        for messenger in &self.messengers {
            messenger.check().await?;
        }
        Ok(())
    }
}
