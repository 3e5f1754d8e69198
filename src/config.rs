//! Configuration for the conversion pipeline.
//!
//! Provides the tunable parameters for binary-to-parquet conversion
//! (stage chunking, compression, row group layout) together with the
//! validation rules the CLI relies on.

use crate::constants::{DEFAULT_ROW_GROUP_SIZE, DEFAULT_STAGE_CHUNKS};
use crate::error::{GrafError, Result};
use clap::ValueEnum;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Configuration for a single binary-to-parquet conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Number of stage chunks the input is split into for streaming
    pub stage_chunks: usize,

    /// Compression algorithm for the output file
    pub compression: CompressionAlgorithm,

    /// Target row group size (None = let polars decide)
    pub row_group_size: Option<usize>,

    /// Enable column statistics for query pruning
    pub statistics: bool,

    /// Show a progress bar while converting
    pub show_progress: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            stage_chunks: DEFAULT_STAGE_CHUNKS,
            compression: CompressionAlgorithm::Snappy,
            row_group_size: Some(DEFAULT_ROW_GROUP_SIZE),
            statistics: true,
            show_progress: false,
        }
    }
}

impl ConvertConfig {
    /// Create configuration with a custom stage chunk count
    pub fn with_stage_chunks(mut self, stage_chunks: usize) -> Self {
        self.stage_chunks = stage_chunks;
        self
    }

    /// Create configuration with a custom compression algorithm
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    /// Create configuration with a custom row group size
    pub fn with_row_group_size(mut self, row_group_size: Option<usize>) -> Self {
        self.row_group_size = row_group_size;
        self
    }

    /// Disable column statistics in the output
    pub fn without_statistics(mut self) -> Self {
        self.statistics = false;
        self
    }

    /// Enable the progress bar
    pub fn with_progress(mut self) -> Self {
        self.show_progress = true;
        self
    }

    /// Validate the configuration before running a conversion
    pub fn validate(&self) -> Result<()> {
        if self.stage_chunks == 0 {
            return Err(GrafError::configuration("stage_chunks must be at least 1"));
        }
        if self.row_group_size == Some(0) {
            return Err(GrafError::configuration(
                "row_group_size must be positive when set",
            ));
        }
        Ok(())
    }
}
