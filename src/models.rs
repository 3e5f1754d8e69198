//! Core data structures and types for graf result processing.
//!
//! Defines the time/granularity enums shared by both reader backends,
//! open options, calendar period derivation, and conversion statistics.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{MONTHS_PER_YEAR, THIRTEEN_MONTHS_PER_YEAR, WEEKS_PER_YEAR};

/// What one block index means for a file: a demand block or a clock hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Block,
    Hour,
}

impl TimeUnit {
    /// Decode the header flag; zero is block data, anything else hourly.
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            TimeUnit::Block
        } else {
            TimeUnit::Hour
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeUnit::Block => "block",
            TimeUnit::Hour => "hour",
        }
    }
}

/// Stage resolution of the simulation horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageGranularity {
    Weekly,
    Monthly,
    ThirteenMonthly,
}

impl StageGranularity {
    /// Decode the granularity code carried in headers.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(StageGranularity::Weekly),
            2 => Some(StageGranularity::Monthly),
            3 => Some(StageGranularity::ThirteenMonthly),
            _ => None,
        }
    }

    /// Stages per calendar year at this granularity.
    pub fn period_length(&self) -> i32 {
        match self {
            StageGranularity::Weekly => WEEKS_PER_YEAR,
            StageGranularity::Monthly => MONTHS_PER_YEAR,
            StageGranularity::ThirteenMonthly => THIRTEEN_MONTHS_PER_YEAR,
        }
    }

    /// Column name for the intra-year part of a period key.
    pub fn period_column(&self) -> &'static str {
        match self {
            StageGranularity::Weekly => crate::constants::columns::WEEK,
            StageGranularity::Monthly | StageGranularity::ThirteenMonthly => {
                crate::constants::columns::MONTH
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageGranularity::Weekly => "weekly",
            StageGranularity::Monthly => "monthly",
            StageGranularity::ThirteenMonthly => "13-monthly",
        }
    }
}

/// Text encoding for agent names and the units field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    #[default]
    #[value(name = "utf-8")]
    Utf8,
    #[value(name = "latin-1")]
    Latin1,
}

impl TextEncoding {
    /// Decode raw header bytes. Errors carry the reason only; the caller
    /// attaches the file path.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, String> {
        match self {
            TextEncoding::Utf8 => std::str::from_utf8(bytes)
                .map(|s| s.to_string())
                .map_err(|e| format!("invalid UTF-8 at byte {}", e.valid_up_to())),
            // Latin-1 maps every byte to the same code point, so this
            // cannot fail.
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Options applied when opening a result file.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    pub encoding: TextEncoding,
    pub print_metadata: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_print_metadata(mut self, print_metadata: bool) -> Self {
        self.print_metadata = print_metadata;
        self
    }
}

/// Resolve a stage number to its `(year, month_or_week)` calendar period.
///
/// The anchors come from the file's own header; continuing cases whose
/// first stage is not the first period of the year resolve correctly
/// because the case anchor shifts the origin.
pub fn period_of(
    stage: i32,
    granularity: StageGranularity,
    initial_stage_of_case: i32,
    initial_year: i32,
) -> (i32, i32) {
    let length = granularity.period_length();
    let shifted = stage + initial_stage_of_case - 2;
    let year = shifted.div_euclid(length) + initial_year;
    let period = shifted.rem_euclid(length) + 1;
    (year, period)
}

/// Outcome of one streaming conversion job.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionStats {
    pub variable: String,
    pub output_path: PathBuf,
    pub rows_written: usize,
    pub chunks_written: usize,
    pub agent_count: usize,
    pub elapsed_ms: u128,
}

/// One variable that failed during a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct FailedVariable {
    pub variable: String,
    pub error: String,
}

/// Aggregate outcome of a batch convert run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub converted: Vec<ConversionStats>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedVariable>,
    pub elapsed_ms: u128,
}

impl BatchSummary {
    pub fn total_rows(&self) -> usize {
        self.converted.iter().map(|s| s.rows_written).sum()
    }
}
