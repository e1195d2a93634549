use crate::data::ResponseStatus;

/// Error taxonomy for the pipeline.
///
/// `Config` is fatal and never retried. `NotFound` is recoverable only
/// through the current-deployment create-if-absent path. `Delivery` failures
/// are retried implicitly because the message stays unsent until a success
/// response is persisted. `Resource` aborts the single task invocation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("delivery failed ({status:?}): {reason}")]
    Delivery {
        status: ResponseStatus,
        reason: String,
    },

    #[error("resource unavailable: {0}")]
    Resource(String),

    #[error("health check failed: {0}")]
    HealthCheck(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Whether a sqlx error is a unique-constraint violation.
/// Used to translate duplicate-key inserts into get-or-create fallbacks.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
