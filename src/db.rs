use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::constants::EXPECTED_DB_VERSION;
use crate::error::{Error, Result};
use crate::queries::{ddl, metadata};

/// Open a file-based database pool for production use.
/// Enables WAL mode and foreign keys.
pub async fn open_database(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create the metadata-store schema (deployments, recordings, model outputs,
/// detections, tags) and stamp the schema version.
pub async fn init_metadata_schema(pool: &SqlitePool) -> Result<()> {
    for sql in [
        ddl::create_metadata_table(),
        ddl::create_deployments_table(),
        ddl::create_recordings_table(),
        ddl::create_model_outputs_table(),
        ddl::create_detections_table(),
        ddl::create_predicted_tags_table(),
        ddl::create_recordings_path_index(),
    ] {
        sqlx::query(&sql).execute(pool).await?;
    }
    check_schema_version(pool).await
}

/// Create the outbox schema (messages, responses) and stamp the schema version.
pub async fn init_outbox_schema(pool: &SqlitePool) -> Result<()> {
    for sql in [
        ddl::create_metadata_table(),
        ddl::create_messages_table(),
        ddl::create_responses_table(),
        ddl::create_responses_message_index(),
    ] {
        sqlx::query(&sql).execute(pool).await?;
    }
    check_schema_version(pool).await
}

/// Stamp the schema version on first use and refuse to open a store written
/// by an incompatible version.
async fn check_schema_version(pool: &SqlitePool) -> Result<()> {
    let sql = metadata::select_by_key("version");
    let row = sqlx::query(&sql).fetch_optional(pool).await?;

    match row {
        None => {
            let sql = metadata::insert("version", EXPECTED_DB_VERSION);
            sqlx::query(&sql).execute(pool).await?;
            Ok(())
        }
        Some(row) => {
            let version: String = row.try_get("value")?;
            if version != EXPECTED_DB_VERSION {
                return Err(Error::Config(format!(
                    "database schema version {version} does not match expected {EXPECTED_DB_VERSION}"
                )));
            }
            Ok(())
        }
    }
}

/// Create an in-memory database pool for testing.
///
/// Capped at one connection: every sqlite `:memory:` connection is its own
/// database.
pub async fn create_test_connection_in_memory() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid in-memory connection string")
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to create in-memory database")
}

/// Create a file-backed database pool in a temporary directory for testing.
/// Keep the returned guard alive for the lifetime of the pool.
pub async fn create_test_connection_in_temporary_file() -> Result<(SqlitePool, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let pool = open_database(&dir.path().join("test.sqlite")).await?;
    Ok((pool, dir))
}
