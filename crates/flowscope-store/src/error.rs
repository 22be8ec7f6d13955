use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset file not found: {0}")]
    CsvNotFound(PathBuf),

    #[error("'Label' column not found in dataset")]
    MissingLabelColumn,

    #[error("dataset has {actual} feature columns, expected {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("dataset has no column named {0:?}")]
    MissingColumn(String),

    #[error("row {row} has no label")]
    NullLabel { row: usize },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
