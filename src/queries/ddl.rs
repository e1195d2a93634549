use sea_query::{
    ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table,
};

use crate::schema::{
    Deployments, Detections, Messages, Metadata, ModelOutputs, PredictedTags, Recordings,
    Responses,
};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS deployments (
///     id TEXT PRIMARY KEY,
///     name TEXT NOT NULL,
///     latitude REAL,
///     longitude REAL,
///     started_on_ms INTEGER NOT NULL UNIQUE,
///     ended_on_ms INTEGER
/// )
pub fn create_deployments_table() -> String {
    Table::create()
        .table(Deployments::Table)
        .if_not_exists()
        .col(ColumnDef::new(Deployments::Id).string().primary_key())
        .col(ColumnDef::new(Deployments::Name).string().not_null())
        .col(ColumnDef::new(Deployments::Latitude).double())
        .col(ColumnDef::new(Deployments::Longitude).double())
        .col(
            ColumnDef::new(Deployments::StartedOnMs)
                .big_integer()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Deployments::EndedOnMs).big_integer())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS recordings (
///     id TEXT PRIMARY KEY,
///     deployment_id TEXT NOT NULL REFERENCES deployments(id),
///     timestamp_ms INTEGER NOT NULL UNIQUE,
///     duration_s REAL NOT NULL,
///     samplerate_hz INTEGER NOT NULL,
///     audio_channels INTEGER NOT NULL,
///     path TEXT
/// )
pub fn create_recordings_table() -> String {
    Table::create()
        .table(Recordings::Table)
        .if_not_exists()
        .col(ColumnDef::new(Recordings::Id).string().primary_key())
        .col(ColumnDef::new(Recordings::DeploymentId).string().not_null())
        .col(
            ColumnDef::new(Recordings::TimestampMs)
                .big_integer()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(Recordings::DurationS).double().not_null())
        .col(
            ColumnDef::new(Recordings::SamplerateHz)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(Recordings::AudioChannels)
                .integer()
                .not_null(),
        )
        .col(ColumnDef::new(Recordings::Path).string())
        .foreign_key(
            ForeignKey::create()
                .from(Recordings::Table, Recordings::DeploymentId)
                .to(Deployments::Table, Deployments::Id),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS model_outputs (
///     id TEXT PRIMARY KEY,
///     recording_id TEXT NOT NULL REFERENCES recordings(id),
///     model_name TEXT NOT NULL,
///     created_on_ms INTEGER NOT NULL
/// )
pub fn create_model_outputs_table() -> String {
    Table::create()
        .table(ModelOutputs::Table)
        .if_not_exists()
        .col(ColumnDef::new(ModelOutputs::Id).string().primary_key())
        .col(
            ColumnDef::new(ModelOutputs::RecordingId)
                .string()
                .not_null(),
        )
        .col(ColumnDef::new(ModelOutputs::ModelName).string().not_null())
        .col(
            ColumnDef::new(ModelOutputs::CreatedOnMs)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(ModelOutputs::Table, ModelOutputs::RecordingId)
                .to(Recordings::Table, Recordings::Id),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS detections (
///     id TEXT PRIMARY KEY,
///     model_output_id TEXT NOT NULL REFERENCES model_outputs(id) ON DELETE CASCADE,
///     location TEXT,
///     probability REAL NOT NULL
/// )
pub fn create_detections_table() -> String {
    Table::create()
        .table(Detections::Table)
        .if_not_exists()
        .col(ColumnDef::new(Detections::Id).string().primary_key())
        .col(
            ColumnDef::new(Detections::ModelOutputId)
                .string()
                .not_null(),
        )
        .col(ColumnDef::new(Detections::Location).string())
        .col(ColumnDef::new(Detections::Probability).double().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(Detections::Table, Detections::ModelOutputId)
                .to(ModelOutputs::Table, ModelOutputs::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS predicted_tags (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     model_output_id TEXT REFERENCES model_outputs(id) ON DELETE CASCADE,
///     detection_id TEXT REFERENCES detections(id) ON DELETE CASCADE,
///     key TEXT NOT NULL,
///     value TEXT NOT NULL,
///     probability REAL NOT NULL
/// )
///
/// A tag row belongs to either a model output or a detection, never both.
pub fn create_predicted_tags_table() -> String {
    Table::create()
        .table(PredictedTags::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(PredictedTags::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(PredictedTags::ModelOutputId).string())
        .col(ColumnDef::new(PredictedTags::DetectionId).string())
        .col(ColumnDef::new(PredictedTags::Key).string().not_null())
        .col(ColumnDef::new(PredictedTags::Value).string().not_null())
        .col(
            ColumnDef::new(PredictedTags::Probability)
                .double()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(PredictedTags::Table, PredictedTags::ModelOutputId)
                .to(ModelOutputs::Table, ModelOutputs::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .foreign_key(
            ForeignKey::create()
                .from(PredictedTags::Table, PredictedTags::DetectionId)
                .to(Detections::Table, Detections::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_recordings_path ON recordings(path)
pub fn create_recordings_path_index() -> String {
    Index::create()
        .name("idx_recordings_path")
        .table(Recordings::Table)
        .col(Recordings::Path)
        .if_not_exists()
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS messages (
///     id TEXT PRIMARY KEY,
///     content TEXT NOT NULL,
///     created_on_ms INTEGER NOT NULL
/// )
pub fn create_messages_table() -> String {
    Table::create()
        .table(Messages::Table)
        .if_not_exists()
        .col(ColumnDef::new(Messages::Id).string().primary_key())
        .col(ColumnDef::new(Messages::Content).string().not_null())
        .col(
            ColumnDef::new(Messages::CreatedOnMs)
                .big_integer()
                .not_null(),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS responses (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     message_id TEXT NOT NULL REFERENCES messages(id),
///     status INTEGER NOT NULL,
///     content TEXT,
///     received_on_ms INTEGER NOT NULL
/// )
pub fn create_responses_table() -> String {
    Table::create()
        .table(Responses::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Responses::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Responses::MessageId).string().not_null())
        .col(ColumnDef::new(Responses::Status).integer().not_null())
        .col(ColumnDef::new(Responses::Content).string())
        .col(
            ColumnDef::new(Responses::ReceivedOnMs)
                .big_integer()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Responses::Table, Responses::MessageId)
                .to(Messages::Table, Messages::Id),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_responses_message ON responses(message_id, status)
pub fn create_responses_message_index() -> String {
    Index::create()
        .name("idx_responses_message")
        .table(Responses::Table)
        .col(Responses::MessageId)
        .col(Responses::Status)
        .if_not_exists()
        .to_string(SqliteQueryBuilder)
}
