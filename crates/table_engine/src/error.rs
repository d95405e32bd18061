//! Error types for table editing operations

use table_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Invalid table dimensions {rows}x{cols} (limit {max_rows}x{max_cols})")]
    InvalidDimensions {
        rows: usize,
        cols: usize,
        max_rows: usize,
        max_cols: usize,
    },

    #[error("Tables cannot be inserted inside another table")]
    NestedTable,

    #[error("Document model error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;
