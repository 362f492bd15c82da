use thiserror::Error;

use super::types::{AlertId, AlertStatus};

/// Failure to turn a backend record into an [`Alert`](super::types::Alert).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed alert record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown severity: {0:?}")]
    UnknownSeverity(String),

    #[error("unknown status: {0:?}")]
    UnknownStatus(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("empty field: {0}")]
    EmptyField(&'static str),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("alert store is closed")]
    Closed,

    #[error("alert not found: {0}")]
    NotFound(AlertId),

    #[error("status of {id} cannot move back from {from} to {to}")]
    StatusRegression {
        id: AlertId,
        from: AlertStatus,
        to: AlertStatus,
    },
}
