//! Sqlite-backed outbox: the store-and-forward half of message delivery.
//!
//! Messages are appended before any delivery attempt and stay eligible for
//! sending until a success response is recorded, which makes delivery
//! at-least-once across crashes and network loss. The remote endpoint must
//! tolerate duplicates.

use std::path::Path;

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

use crate::data::{millis_to_datetime, Message, Response, ResponseStatus};
use crate::db;
use crate::error::{Error, Result};
use crate::queries::messages;

#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    /// Open (creating if necessary) the outbox at the given path.
    pub async fn open(path: &Path) -> Result<Self> {
        let pool = db::open_database(path).await?;
        db::init_outbox_schema(&pool).await?;
        Ok(SqliteMessageStore { pool })
    }

    /// Wrap an already-initialized pool. The schema must exist.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteMessageStore { pool }
    }

    /// Append a message to the outbox. Storing the same id twice is a no-op.
    pub async fn store_message(&self, message: &Message) -> Result<()> {
        let sql = messages::insert(
            &message.id.to_string(),
            &message.content,
            message.created_on.timestamp_millis(),
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Every message without a success response, oldest first. Messages with
    /// only failed/error/timeout responses (or none at all) are eligible.
    pub async fn get_unsent_messages(&self) -> Result<Vec<Message>> {
        let sql = messages::select_unsent();
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_message).collect()
    }

    /// Record the response to a delivery attempt.
    ///
    /// If the message row does not exist yet (enqueue and send racing), it is
    /// created in the same transaction so the receipt is never lost.
    pub async fn store_response(&self, response: &Response) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let message = &response.message;
        let sql = messages::insert(
            &message.id.to_string(),
            &message.content,
            message.created_on.timestamp_millis(),
        );
        sqlx::query(&sql).execute(&mut *tx).await?;

        let sql = messages::insert_response(
            &message.id.to_string(),
            response.status as i64,
            response.content.as_deref(),
            response.received_on.timestamp_millis(),
        );
        sqlx::query(&sql).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Responses recorded for a message, oldest first.
    pub async fn get_responses(&self, message_id: Uuid) -> Result<Vec<(ResponseStatus, Option<String>)>> {
        let sql = messages::select_responses(&message_id.to_string());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let status = ResponseStatus::from_i64(row.try_get("status")?)?;
                let content: Option<String> = row.try_get("content")?;
                Ok((status, content))
            })
            .collect()
    }
}

fn row_to_message(row: &SqliteRow) -> Result<Message> {
    let id: String = row.try_get("id")?;
    Ok(Message {
        id: Uuid::parse_str(&id)
            .map_err(|err| Error::Validation(format!("corrupt uuid {id}: {err}")))?,
        content: row.try_get("content")?,
        created_on: millis_to_datetime(row.try_get("created_on_ms")?)?,
    })
}
