use thiserror::Error;

use crate::state::WorkflowPhase;

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("Invalid CSV structure: required columns {0} are missing")]
    InvalidStructure(String),

    #[error("Row {row} has no value for required column {column}")]
    MissingValue { row: usize, column: &'static str },

    #[error("Invalid sale record at row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Operation not allowed in phase {actual:?}: expected {expected}")]
    InvalidPhase {
        expected: &'static str,
        actual: WorkflowPhase,
    },

    #[error("{service} service did not report success: {message}")]
    ServiceRejected {
        service: &'static str,
        message: String,
    },

    #[error("{0} service reported success without a data payload")]
    MissingData(&'static str),

    #[error("There are no normalized sales to export")]
    NothingToExport,

    #[error("Transport error: {0}")]
    Transport(String),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SalesError>;
