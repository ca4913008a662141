use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Required threshold '{key}' is not configured")]
    ConfigMissing { key: String },

    #[error("Invalid threshold '{key}': {reason}")]
    InvalidConfig { key: String, reason: String },

    #[error("Inconsistent snapshot: reference date {expected} vs {actual}")]
    InconsistentSnapshot {
        expected: NaiveDate,
        actual:   NaiveDate,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MetricsResult<T> = Result<T, MetricsError>;
