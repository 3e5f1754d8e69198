//! Command-line argument definitions for the graf processor.
//!
//! The complete CLI surface using the clap derive API: one subcommand per
//! workflow (batch conversion, CSV export, header inspection).

use crate::config::{CompressionAlgorithm, ConvertConfig};
use crate::constants::{DEFAULT_STAGE_CHUNKS, DEFAULT_VARIABLES, DEFAULT_WORKERS};
use crate::error::{GrafError, Result};
use crate::frame::{FrameOptions, KeyLayout};
use crate::models::{OpenOptions, TextEncoding};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI arguments for the graf result file processor
///
/// Converts PSR SDDP simulation results from their binary hdr/bin layout
/// into Parquet files sized for analytical workloads.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "graf-processor",
    version,
    about = "Convert SDDP graf result binaries to Parquet and CSV",
    long_about = "Reads the hdr/bin result pairs written by SDDP simulation runs and streams \
                  them into columnar Parquet files, one row per stage, scenario and block. \
                  Also exports filtered CSV projections of single result files and prints \
                  header metadata for quick inspection."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the graf processor
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Convert result binaries in a case directory to Parquet
    Convert(ConvertArgs),
    /// Export one result file as a CSV projection
    Csv(CsvArgs),
    /// Print the header metadata of a result file
    Info(InfoArgs),
}

/// Arguments for the convert command (batch binary-to-parquet)
#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// Path to the SDDP case directory
    ///
    /// The directory holding the result files of one simulation run,
    /// e.g. gerter.hdr/gerter.bin pairs. Output files land next to the
    /// inputs unless --output is given.
    #[arg(value_name = "CASE_DIR", help = "Path to the SDDP case directory")]
    pub case_path: PathBuf,

    /// Result variables to convert
    ///
    /// Names are file stems relative to the case directory, e.g. gerter
    /// or cmgbus. When none are given, the standard variable set is
    /// converted: gerter, gerhid, cmgbus, demxba and friends.
    #[arg(value_name = "VARIABLE", help = "Result variables to convert")]
    pub variables: Vec<String>,

    /// Convert every result file found in the case directory
    ///
    /// Scans the case directory for header files instead of using the
    /// standard variable set.
    #[arg(
        long = "all",
        conflicts_with = "variables",
        help = "Convert every result file found in the case directory"
    )]
    pub all: bool,

    /// Output directory for generated Parquet files
    ///
    /// Will be created if it doesn't exist. Defaults to the case
    /// directory itself.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        help = "Output directory for generated Parquet files"
    )]
    pub output_path: Option<PathBuf>,

    /// Number of stage chunks per conversion
    ///
    /// Each input is split into this many stage ranges and streamed
    /// chunk by chunk, bounding memory at roughly one chunk per worker.
    #[arg(
        short = 'k',
        long = "stage-chunks",
        value_name = "COUNT",
        default_value_t = DEFAULT_STAGE_CHUNKS,
        help = "Number of stage chunks each input is streamed in"
    )]
    pub stage_chunks: usize,

    /// Parquet compression algorithm
    #[arg(
        long = "compression",
        value_enum,
        default_value = "snappy",
        help = "Parquet compression algorithm"
    )]
    pub compression: CompressionAlgorithm,

    /// Target Parquet row group size
    #[arg(
        long = "row-group-size",
        value_name = "ROWS",
        help = "Target Parquet row group size"
    )]
    pub row_group_size: Option<usize>,

    /// Disable Parquet column statistics
    #[arg(long = "no-statistics", help = "Disable Parquet column statistics")]
    pub no_statistics: bool,

    /// Number of variables converted concurrently
    ///
    /// Each conversion runs its own reader and writer pair, so more
    /// workers trade memory for throughput. Zero means one per CPU core.
    #[arg(
        short = 'j',
        long = "workers",
        value_name = "COUNT",
        default_value_t = DEFAULT_WORKERS,
        help = "Number of variables converted concurrently (0 = one per CPU core)"
    )]
    pub workers: usize,

    /// Force overwrite of existing output files
    ///
    /// By default a variable whose Parquet file already exists is
    /// skipped so batch runs can be resumed.
    #[arg(long = "force", help = "Force overwrite of existing output files")]
    pub force: bool,

    /// Text encoding of agent names and units in the headers
    #[arg(
        long = "encoding",
        value_enum,
        default_value = "utf-8",
        help = "Text encoding of agent names in the headers"
    )]
    pub encoding: TextEncoding,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output format for the final report
    #[arg(
        long = "output-format",
        value_enum,
        default_value = "human",
        help = "Output format for the final report"
    )]
    pub output_format: OutputFormat,
}

/// Arguments for the csv command (single-file projection export)
#[derive(Debug, Clone, Parser)]
pub struct CsvArgs {
    /// Result file to export
    ///
    /// A header file, a single-file binary, a table file, or a bare
    /// stem next to its hdr/bin pair.
    #[arg(value_name = "RESULT_FILE", help = "Result file to export")]
    pub input: PathBuf,

    /// Output CSV path
    ///
    /// Defaults to the input path with a csv extension.
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        help = "Output CSV path"
    )]
    pub output_path: Option<PathBuf>,

    /// Agents to include (comma-separated, case-insensitive)
    ///
    /// Output columns follow the order given here. Unknown names are
    /// logged and skipped.
    #[arg(
        long = "agents",
        value_name = "LIST",
        help = "Comma-separated list of agents to include"
    )]
    pub agents: Option<NameList>,

    /// Stages to include (comma-separated)
    #[arg(
        long = "stages",
        value_name = "LIST",
        help = "Comma-separated list of stages to include"
    )]
    pub stages: Option<IndexList>,

    /// Scenarios to include (comma-separated)
    #[arg(
        long = "scenarios",
        value_name = "LIST",
        help = "Comma-separated list of scenarios to include"
    )]
    pub scenarios: Option<IndexList>,

    /// Blocks to include (comma-separated)
    #[arg(
        long = "blocks",
        value_name = "LIST",
        help = "Comma-separated list of blocks to include"
    )]
    pub blocks: Option<IndexList>,

    /// Key column layout
    #[arg(
        long = "key",
        value_enum,
        default_value = "flat",
        help = "Key column layout (flat or composite)"
    )]
    pub key_layout: KeyLayout,

    /// Emit calendar year and period columns instead of the stage key
    #[arg(
        long = "period-key",
        help = "Emit calendar year and period columns instead of the stage key"
    )]
    pub period_key: bool,

    /// Text encoding of agent names and units in the headers
    #[arg(
        long = "encoding",
        value_enum,
        default_value = "utf-8",
        help = "Text encoding of agent names in the headers"
    )]
    pub encoding: TextEncoding,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,
}

/// Arguments for the info command (header inspection)
#[derive(Debug, Clone, Parser)]
pub struct InfoArgs {
    /// Result file to inspect
    #[arg(value_name = "RESULT_FILE", help = "Result file to inspect")]
    pub input: PathBuf,

    /// Text encoding of agent names and units in the headers
    #[arg(
        long = "encoding",
        value_enum,
        default_value = "utf-8",
        help = "Text encoding of agent names in the headers"
    )]
    pub encoding: TextEncoding,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,
}

/// Output format options for the convert report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON format for scripting
    Json,
}

/// Wrapper for parsing comma-separated agent name lists
#[derive(Debug, Clone)]
pub struct NameList {
    pub names: Vec<String>,
}

impl FromStr for NameList {
    type Err = GrafError;

    fn from_str(s: &str) -> Result<Self> {
        let names: Vec<String> = s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();

        if names.is_empty() {
            return Err(GrafError::configuration("Agent list cannot be empty"));
        }

        Ok(NameList { names })
    }
}

/// Wrapper for parsing comma-separated index lists
#[derive(Debug, Clone)]
pub struct IndexList {
    pub values: Vec<i32>,
}

impl FromStr for IndexList {
    type Err = GrafError;

    fn from_str(s: &str) -> Result<Self> {
        let mut values = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let value: i32 = part.parse().map_err(|_| {
                GrafError::configuration(format!("Invalid index '{}' in list", part))
            })?;
            values.push(value);
        }

        if values.is_empty() {
            return Err(GrafError::configuration("Index list cannot be empty"));
        }

        Ok(IndexList { values })
    }
}

impl ConvertArgs {
    /// Validate the convert command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.case_path.exists() {
            return Err(GrafError::configuration(format!(
                "Case directory does not exist: {}",
                self.case_path.display()
            )));
        }

        if !self.case_path.is_dir() {
            return Err(GrafError::configuration(format!(
                "Case path is not a directory: {}",
                self.case_path.display()
            )));
        }

        if self.workers > 64 {
            return Err(GrafError::configuration(
                "Number of workers cannot exceed 64",
            ));
        }

        if let Some(output_path) = &self.output_path {
            if output_path.exists() && !output_path.is_dir() {
                return Err(GrafError::configuration(format!(
                    "Output path is not a directory: {}",
                    output_path.display()
                )));
            }
        }

        Ok(())
    }

    /// Get the list of variables to convert
    pub fn get_variables(&self) -> Vec<String> {
        if self.variables.is_empty() {
            DEFAULT_VARIABLES.iter().map(|s| s.to_string()).collect()
        } else {
            self.variables.clone()
        }
    }

    /// Get the output directory, defaulting to the case directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| self.case_path.clone())
    }

    /// Number of concurrent conversions after resolving the auto setting
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        verbosity_level(self.verbose, self.quiet)
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Build the conversion configuration from these arguments
    pub fn to_convert_config(&self) -> ConvertConfig {
        let mut config = ConvertConfig::default()
            .with_stage_chunks(self.stage_chunks)
            .with_compression(self.compression);
        if let Some(rows) = self.row_group_size {
            config = config.with_row_group_size(Some(rows));
        }
        if self.no_statistics {
            config = config.without_statistics();
        }
        if self.show_progress() {
            config = config.with_progress();
        }
        config
    }

    /// Build the reader open options from these arguments
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::new().with_encoding(self.encoding)
    }
}

impl CsvArgs {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        verbosity_level(self.verbose, false)
    }

    /// Default output path: the input with a csv extension
    pub fn default_output(&self) -> PathBuf {
        self.input.with_extension("csv")
    }

    /// Build the projection options from these arguments
    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            agents: self.agents.as_ref().map(|list| list.names.clone()),
            stages: self.stages.as_ref().map(|list| list.values.clone()),
            scenarios: self.scenarios.as_ref().map(|list| list.values.clone()),
            blocks: self.blocks.as_ref().map(|list| list.values.clone()),
            key_layout: self.key_layout,
            period_key: self.period_key,
        }
    }

    /// Build the reader open options from these arguments
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::new().with_encoding(self.encoding)
    }
}

impl InfoArgs {
    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        verbosity_level(self.verbose, false)
    }

    /// Build the reader open options from these arguments
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions::new()
            .with_encoding(self.encoding)
            .with_print_metadata(true)
    }
}

fn verbosity_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
