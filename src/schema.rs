use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Deployments table - field placements of the device
#[derive(Iden)]
pub enum Deployments {
    Table,
    Id,
    Name,
    Latitude,
    Longitude,
    StartedOnMs,
    EndedOnMs,
}

/// Recordings table - captured audio files
#[derive(Iden)]
pub enum Recordings {
    Table,
    Id,
    DeploymentId,
    TimestampMs,
    DurationS,
    SamplerateHz,
    AudioChannels,
    Path,
}

/// Model outputs table - one row per model run over a recording
#[derive(Iden)]
pub enum ModelOutputs {
    Table,
    Id,
    RecordingId,
    ModelName,
    CreatedOnMs,
}

/// Detections table - localized events within a model output
#[derive(Iden)]
pub enum Detections {
    Table,
    Id,
    ModelOutputId,
    Location,
    Probability,
}

/// Predicted tags table - labels attached to a model output or a detection
#[derive(Iden)]
pub enum PredictedTags {
    Table,
    Id,
    ModelOutputId,
    DetectionId,
    Key,
    Value,
    Probability,
}

/// Messages table - outbox payloads awaiting delivery
#[derive(Iden)]
pub enum Messages {
    Table,
    Id,
    Content,
    CreatedOnMs,
}

/// Responses table - one row per delivery attempt
#[derive(Iden)]
pub enum Responses {
    Table,
    Id,
    MessageId,
    Status,
    Content,
    ReceivedOnMs,
}
