//! Graf Processor Library
//!
//! A Rust library for reading PSR SDDP "graf" result files (hdr/bin binary
//! pairs, single-file binaries, and table-formatted text results) and
//! converting them into optimized Apache Parquet files.
//!
//! This library provides tools for:
//! - Decoding the three versioned graf binary header layouts
//! - Random access to any (stage, scenario, block) cell of a result file
//! - Streaming whole result files into Parquet with bounded memory
//! - Projecting results into DataFrames and CSV with filters and period keys
//! - Resolving stage indexes to calendar years, months and weeks

pub mod config;
pub mod constants;
pub mod convert;
pub mod error;
pub mod frame;
pub mod header;
pub mod models;
pub mod reader;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{CompressionAlgorithm, ConvertConfig};
pub use convert::Converter;
pub use error::{GrafError, Result};
pub use frame::{export_csv, load_dataframe, FrameOptions, KeyLayout};
pub use header::GrafHeader;
pub use models::{
    ConversionStats, OpenOptions, StageGranularity, TextEncoding, TimeUnit,
};
pub use reader::{open_result_file, BinReader, ResultReader, TableReader};
