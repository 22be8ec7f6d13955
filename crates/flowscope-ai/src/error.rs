use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("unsupported model format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("input has no column named {0:?}")]
    MissingColumn(String),

    #[error("null value in column {column:?} at row {row}")]
    NullValue { column: String, row: usize },

    #[error("inference failed: {0}")]
    Inference(String),

    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Onnx(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
