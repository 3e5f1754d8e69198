//! Application constants for the graf processor.
//!
//! Binary format geometry, calendar tables, output schema names, and
//! default values used throughout the crate.

// =============================================================================
// Binary Format Geometry
// =============================================================================

/// Size in bytes of one stored word (float32 values, int32 header fields).
pub const WORD_SIZE: u64 = 4;

/// Fixed size in bytes of the units string inside a binary header.
pub const UNITS_FIELD_LEN: usize = 7;

/// Upper bound accepted for one stored agent name record.
pub const MAX_NAME_BYTES: usize = 4096;

/// Oldest binary header layout this crate decodes.
pub const MIN_FORMAT_VERSION: i32 = 1;

/// Newest binary header layout this crate decodes.
pub const MAX_FORMAT_VERSION: i32 = 3;

// =============================================================================
// File Extensions and Naming
// =============================================================================

/// Extension of the header half of a paired result file.
pub const HEADER_EXTENSION: &str = "hdr";

/// Extension of the data half of a paired result file.
pub const DATA_EXTENSION: &str = "bin";

/// Extension routed to the table-backed reader.
pub const TABLE_EXTENSION: &str = "csv";

/// Suffix appended to the final output path while a conversion is running.
/// The finished file appears only through a rename from this path.
pub const PART_SUFFIX: &str = ".part";

// =============================================================================
// Calendar Tables
// =============================================================================

/// Hours in one week, used to recognize hourly weekly data.
pub const HOURS_PER_WEEK: i32 = 168;

/// Hours per calendar month, January through December, no leap handling.
pub const HOURS_PER_MONTH: [i32; 12] = [
    744, 672, 744, 720, 744, 720, 744, 744, 720, 744, 720, 744,
];

/// Stages per year for weekly granularity.
pub const WEEKS_PER_YEAR: i32 = 52;

/// Stages per year for monthly granularity.
pub const MONTHS_PER_YEAR: i32 = 12;

/// Stages per year for thirteen-monthly granularity (uniform 4-week months).
pub const THIRTEEN_MONTHS_PER_YEAR: i32 = 13;

/// Hours in one uniform 4-week month of a thirteen-monthly horizon.
pub const HOURS_PER_THIRTEEN_MONTH: i32 = 672;

// =============================================================================
// Output Schema Column Names
// =============================================================================

/// Key column names shared by the Parquet and CSV outputs.
pub mod columns {
    pub const STAGE: &str = "stage";
    pub const SCENARIO: &str = "scenario";
    pub const BLOCK: &str = "block";

    /// Composite key column emitted instead of the flat key columns.
    pub const CELL: &str = "cell";

    /// Period key columns emitted when the stage is resolved to a calendar.
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const WEEK: &str = "week";
}

// =============================================================================
// Conversion Defaults
// =============================================================================

/// Default number of stage chunks per conversion job.
pub const DEFAULT_STAGE_CHUNKS: usize = 10;

/// Row group size for optimal sequential read performance.
pub const DEFAULT_ROW_GROUP_SIZE: usize = 1_000_000;

/// Default number of variables converted concurrently in a batch run.
pub const DEFAULT_WORKERS: usize = 1;

/// Standard SDDP result variables converted when none are named.
pub const DEFAULT_VARIABLES: &[&str] = &[
    "cmgbus", "defbus", "gerter", "gergnd", "gerbat", "gerhid", "coster", "cosco2", "demxba",
    "usedcl",
];

// =============================================================================
// Helper Functions
// =============================================================================

/// Hours in the given 1-based calendar month.
pub fn hours_in_month(month: i32) -> Option<i32> {
    if (1..=12).contains(&month) {
        Some(HOURS_PER_MONTH[(month - 1) as usize])
    } else {
        None
    }
}

/// Expected Parquet output filename for a result variable.
pub fn parquet_output_name(variable: &str) -> String {
    format!("{}.parquet", variable)
}
