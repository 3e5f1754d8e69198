//! Readers over graf result files.
//!
//! Results arrive either as a binary pair (`hdr` metadata next to a
//! `bin` data region), as a single binary carrying both regions, or as
//! a delimited text table in the same stage/scenario/block shape. All
//! three are served through the [`ResultReader`] trait so conversion
//! and projection never care which physical form they were handed.

mod binary;
mod table;

pub use binary::BinReader;
pub use table::TableReader;

use std::path::Path;

use crate::constants::TABLE_EXTENSION;
use crate::error::Result;
use crate::models::{OpenOptions, StageGranularity, TimeUnit};

/// Random-access view over one result variable.
///
/// Stages run `min_stage()..=max_stage()`; scenarios and blocks are
/// 1-based. Out-of-range coordinates fail with an error naming the
/// offending dimension and its valid bound.
pub trait ResultReader: Send {
    /// Variable name, taken from the file stem.
    fn name(&self) -> &str;

    /// Unit string the values are expressed in.
    fn units(&self) -> &str;

    /// Agent names in storage order, which is also output column order.
    fn agents(&self) -> &[String];

    fn min_stage(&self) -> i32;

    fn max_stage(&self) -> i32;

    fn scenario_count(&self) -> i32;

    fn time_unit(&self) -> TimeUnit;

    fn stage_granularity(&self) -> StageGranularity;

    /// Period of the calendar year the first stage of the case maps to.
    fn initial_stage_of_case(&self) -> i32;

    fn initial_year(&self) -> i32;

    /// Number of blocks stored for `stage`.
    fn blocks_in_stage(&self, stage: i32) -> Result<i32>;

    /// One value per agent at a single `(stage, scenario, block)` cell.
    fn read(&mut self, stage: i32, scenario: i32, block: i32) -> Result<Vec<f32>>;

    /// All blocks of `(stage, scenario)` at once, one inner vector per
    /// agent, each ordered by block.
    fn read_grid(&mut self, stage: i32, scenario: i32) -> Result<Vec<Vec<f32>>>;

    /// Release the underlying resource. Further reads fail; closing an
    /// already-closed reader is a no-op.
    fn close(&mut self) -> Result<()>;

    fn stage_count(&self) -> i32 {
        self.max_stage() - self.min_stage() + 1
    }

    fn agent_count(&self) -> usize {
        self.agents().len()
    }
}

/// Open a result file, picking the backend from its extension: `csv`
/// gets the table reader, everything else the binary reader.
pub fn open_result_file(path: &Path, options: &OpenOptions) -> Result<Box<dyn ResultReader>> {
    let is_table = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TABLE_EXTENSION))
        .unwrap_or(false);

    if is_table {
        Ok(Box::new(TableReader::open(path, options)?))
    } else {
        Ok(Box::new(BinReader::open(path, options)?))
    }
}
