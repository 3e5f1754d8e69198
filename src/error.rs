//! Error handling for graf result file operations.
//!
//! Provides error types with path and reason context for header decoding,
//! cell addressing, and streaming conversion failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GrafError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Report serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Result file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid graf format in file: {path} - {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Undecodable text in file: {path} - {reason}")]
    Encoding { path: PathBuf, reason: String },

    #[error("Stage {stage} out of range ({min}..={max})")]
    StageOutOfRange { stage: i32, min: i32, max: i32 },

    #[error("Scenario {scenario} out of range (1..={count})")]
    ScenarioOutOfRange { scenario: i32, count: i32 },

    #[error("Block {block} out of range (1..={count} for stage {stage})")]
    BlockOutOfRange { block: i32, count: i32, stage: i32 },

    #[error("Reader for {path} is closed")]
    ReaderClosed { path: PathBuf },

    #[error("Conversion failed for file: {path} - {reason}")]
    ConversionFailed { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Processing interrupted: {reason}")]
    Interrupted { reason: String },
}

impl GrafError {
    /// Create a format error with path context.
    pub fn invalid_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an encoding error with path context.
    pub fn encoding(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Encoding {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GrafError>;
