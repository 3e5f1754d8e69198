//! Table-backed reader over delimited text results.
//!
//! Some cases ship a variable only as a CSV table in the same
//! stage/scenario/block shape as the binaries. The whole table is
//! parsed into a keyed map at open time; reads are served from memory
//! through the same contract as the binary reader.
//!
//! Layout: four header lines (per-block variation flag with units,
//! granularity code and calendar anchors; per-scenario variation flag;
//! agent count; column names), then one data line per cell.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::debug;

use crate::constants::{HOURS_PER_THIRTEEN_MONTH, HOURS_PER_WEEK, hours_in_month};
use crate::error::{GrafError, Result};
use crate::models::{OpenOptions, StageGranularity, TimeUnit, period_of};
use crate::reader::ResultReader;

/// Reader over a delimited text table holding one result variable.
///
/// Stage and scenario extents are not declared by the table header;
/// they are taken from the observed keys, as is the per-stage block
/// count.
pub struct TableReader {
    name: String,
    path: PathBuf,
    units: String,
    varies_by_scenario: bool,
    varies_by_block: bool,
    time_unit: TimeUnit,
    stage_granularity: StageGranularity,
    initial_stage_of_case: i32,
    initial_year: i32,
    min_stage: i32,
    max_stage: i32,
    scenario_count: i32,
    agents: Vec<String>,
    max_blocks: BTreeMap<i32, i32>,
    cells: Option<HashMap<(i32, i32, i32), Vec<f32>>>,
}

impl TableReader {
    /// Parse a whole table file into memory.
    pub fn open(path: &Path, options: &OpenOptions) -> Result<Self> {
        if !path.exists() {
            return Err(GrafError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let raw = std::fs::read(path)?;
        let text = options
            .encoding
            .decode(&raw)
            .map_err(|reason| GrafError::encoding(path, reason))?;
        let mut lines = text.lines();

        // Line 1: varies-by-block flag, units, granularity code, anchors
        let line = header_line(&mut lines, 1, path)?;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 5 {
            return Err(GrafError::invalid_format(
                path,
                format!("metadata line has {} fields, expected 5", fields.len()),
            ));
        }
        let varies_by_block = parse_i32(fields[0], "varies-by-block flag", path)? != 0;
        let units = fields[1].trim().to_string();
        let granularity_code = parse_i32(fields[2], "stage granularity code", path)?;
        let initial_stage_of_case = parse_i32(fields[3], "initial stage", path)?;
        let initial_year = parse_i32(fields[4], "initial year", path)?;

        let stage_granularity = StageGranularity::from_code(granularity_code).ok_or_else(|| {
            GrafError::invalid_format(
                path,
                format!("unknown stage granularity code {}", granularity_code),
            )
        })?;

        // Line 2: varies-by-scenario flag
        let line = header_line(&mut lines, 2, path)?;
        let varies_by_scenario = parse_i32(line, "varies-by-scenario flag", path)? != 0;

        // Line 3: agent count
        let line = header_line(&mut lines, 3, path)?;
        let declared_agents = parse_i32(line, "agent count", path)?;

        // Line 4: column names, agents from the fourth column on
        let line = header_line(&mut lines, 4, path)?;
        let columns: Vec<&str> = line.split(',').collect();
        if columns.len() < 3 {
            return Err(GrafError::invalid_format(
                path,
                "column line must start with stage, scenario and block",
            ));
        }
        let agents: Vec<String> = columns[3..]
            .iter()
            .map(|name| name.trim().to_string())
            .collect();
        if agents.len() as i32 != declared_agents {
            return Err(GrafError::invalid_format(
                path,
                format!(
                    "header declares {} agents but the column line lists {}",
                    declared_agents,
                    agents.len()
                ),
            ));
        }

        let mut cells = HashMap::new();
        let mut max_blocks: BTreeMap<i32, i32> = BTreeMap::new();
        let mut min_stage = i32::MAX;
        let mut max_stage = i32::MIN;
        let mut max_scenario = 0;

        for (offset, line) in lines.enumerate() {
            let line_no = offset + 5;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != agents.len() + 3 {
                return Err(GrafError::invalid_format(
                    path,
                    format!(
                        "line {} has {} fields, expected {}",
                        line_no,
                        fields.len(),
                        agents.len() + 3
                    ),
                ));
            }

            let stage = parse_i32(fields[0], &format!("stage on line {}", line_no), path)?;
            let scenario = parse_i32(fields[1], &format!("scenario on line {}", line_no), path)?;
            let block = parse_i32(fields[2], &format!("block on line {}", line_no), path)?;
            if scenario < 1 || block < 1 {
                return Err(GrafError::invalid_format(
                    path,
                    format!("line {} has a non-positive scenario or block", line_no),
                ));
            }

            let mut row = Vec::with_capacity(agents.len());
            for (field, agent) in fields[3..].iter().zip(agents.iter()) {
                let value = field.trim().parse::<f32>().map_err(|_| {
                    GrafError::invalid_format(
                        path,
                        format!(
                            "value for agent '{}' on line {} is not a number: '{}'",
                            agent,
                            line_no,
                            field.trim()
                        ),
                    )
                })?;
                row.push(value);
            }

            min_stage = min_stage.min(stage);
            max_stage = max_stage.max(stage);
            max_scenario = max_scenario.max(scenario);
            let entry = max_blocks.entry(stage).or_insert(0);
            *entry = (*entry).max(block);
            cells.insert((stage, scenario, block), row);
        }

        if cells.is_empty() {
            return Err(GrafError::invalid_format(path, "table holds no data rows"));
        }
        if !varies_by_block {
            if let Some((&stage, &blocks)) = max_blocks.iter().find(|(_, &blocks)| blocks > 1) {
                return Err(GrafError::invalid_format(
                    path,
                    format!(
                        "stage {} has {} blocks but the header says blocks do not vary",
                        stage, blocks
                    ),
                ));
            }
        }

        let scenario_count = if varies_by_scenario { max_scenario } else { 1 };
        let time_unit = infer_time_unit(
            &max_blocks,
            stage_granularity,
            initial_stage_of_case,
            initial_year,
        );

        debug!(
            "Parsed table {}: {} cells, stages {}..={}, {} scenarios",
            path.display(),
            cells.len(),
            min_stage,
            max_stage,
            scenario_count
        );

        let reader = Self {
            name: variable_name(path),
            path: path.to_path_buf(),
            units,
            varies_by_scenario,
            varies_by_block,
            time_unit,
            stage_granularity,
            initial_stage_of_case,
            initial_year,
            min_stage,
            max_stage,
            scenario_count,
            agents,
            max_blocks,
            cells: Some(cells),
        };
        if options.print_metadata {
            reader.print_summary();
        }
        Ok(reader)
    }

    fn ensure_open(&self) -> Result<&HashMap<(i32, i32, i32), Vec<f32>>> {
        self.cells.as_ref().ok_or_else(|| GrafError::ReaderClosed {
            path: self.path.clone(),
        })
    }

    fn validate_stage(&self, stage: i32) -> Result<()> {
        if stage < self.min_stage || stage > self.max_stage {
            return Err(GrafError::StageOutOfRange {
                stage,
                min: self.min_stage,
                max: self.max_stage,
            });
        }
        Ok(())
    }

    fn validate_scenario(&self, scenario: i32) -> Result<()> {
        if scenario < 1 || scenario > self.scenario_count {
            return Err(GrafError::ScenarioOutOfRange {
                scenario,
                count: self.scenario_count,
            });
        }
        Ok(())
    }

    fn observed_blocks(&self, stage: i32) -> i32 {
        if self.varies_by_block {
            self.max_blocks.get(&stage).copied().unwrap_or(0)
        } else {
            1
        }
    }

    /// A validated in-range cell with no stored row means the table has
    /// gaps, which is a format problem rather than a caller mistake.
    fn lookup(&self, stage: i32, scenario: i32, block: i32) -> Result<&[f32]> {
        self.ensure_open()?
            .get(&(stage, scenario, block))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                GrafError::invalid_format(
                    &self.path,
                    format!(
                        "missing data row for stage {} scenario {} block {}",
                        stage, scenario, block
                    ),
                )
            })
    }

    fn print_summary(&self) {
        println!(
            "{}",
            format!("Header of {}", self.name).bright_blue().bold()
        );
        println!(
            "  Stages:             {}..={}",
            self.min_stage, self.max_stage
        );
        println!("  Scenarios:          {}", self.scenario_count);
        println!("  Agents:             {}", self.agents.len());
        println!("  Varies by scenario: {}", self.varies_by_scenario);
        println!("  Varies by block:    {}", self.varies_by_block);
        println!("  Type of data:       {}", self.time_unit.label());
        println!("  Type of stage:      {}", self.stage_granularity.label());
        println!(
            "  Case start:         period {} of {}",
            self.initial_stage_of_case, self.initial_year
        );
        println!("  Units:              {}", self.units);
    }
}

impl ResultReader for TableReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn units(&self) -> &str {
        &self.units
    }

    fn agents(&self) -> &[String] {
        &self.agents
    }

    fn min_stage(&self) -> i32 {
        self.min_stage
    }

    fn max_stage(&self) -> i32 {
        self.max_stage
    }

    fn scenario_count(&self) -> i32 {
        self.scenario_count
    }

    fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    fn stage_granularity(&self) -> StageGranularity {
        self.stage_granularity
    }

    fn initial_stage_of_case(&self) -> i32 {
        self.initial_stage_of_case
    }

    fn initial_year(&self) -> i32 {
        self.initial_year
    }

    fn blocks_in_stage(&self, stage: i32) -> Result<i32> {
        self.validate_stage(stage)?;
        Ok(self.observed_blocks(stage))
    }

    fn read(&mut self, stage: i32, scenario: i32, block: i32) -> Result<Vec<f32>> {
        self.ensure_open()?;
        self.validate_stage(stage)?;
        self.validate_scenario(scenario)?;
        let count = self.observed_blocks(stage);
        if block < 1 || block > count {
            return Err(GrafError::BlockOutOfRange {
                block,
                count,
                stage,
            });
        }
        Ok(self.lookup(stage, scenario, block)?.to_vec())
    }

    fn read_grid(&mut self, stage: i32, scenario: i32) -> Result<Vec<Vec<f32>>> {
        self.ensure_open()?;
        self.validate_stage(stage)?;
        self.validate_scenario(scenario)?;

        let blocks = self.observed_blocks(stage);
        let mut per_agent: Vec<Vec<f32>> = (0..self.agents.len())
            .map(|_| Vec::with_capacity(blocks as usize))
            .collect();
        for block in 1..=blocks {
            let row = self.lookup(stage, scenario, block)?;
            for (series, &value) in per_agent.iter_mut().zip(row) {
                series.push(value);
            }
        }
        Ok(per_agent)
    }

    fn close(&mut self) -> Result<()> {
        if self.cells.take().is_some() {
            debug!("Closed {}", self.path.display());
        }
        Ok(())
    }
}

fn variable_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn header_line<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    which: usize,
    path: &Path,
) -> Result<&'a str> {
    lines.next().ok_or_else(|| {
        GrafError::invalid_format(path, format!("table header truncated at line {}", which))
    })
}

fn parse_i32(field: &str, what: &str, path: &Path) -> Result<i32> {
    field.trim().parse::<i32>().map_err(|_| {
        GrafError::invalid_format(
            path,
            format!("{} is not an integer: '{}'", what, field.trim()),
        )
    })
}

/// Hour-based tables store one block per hour of the stage's calendar
/// period; any stage missing that expectation makes the data block-based.
fn infer_time_unit(
    max_blocks: &BTreeMap<i32, i32>,
    granularity: StageGranularity,
    initial_stage_of_case: i32,
    initial_year: i32,
) -> TimeUnit {
    let hourly = max_blocks.iter().all(|(&stage, &blocks)| match granularity {
        StageGranularity::Weekly => blocks == HOURS_PER_WEEK,
        StageGranularity::Monthly => {
            let (_, month) = period_of(stage, granularity, initial_stage_of_case, initial_year);
            hours_in_month(month).map_or(false, |hours| hours == blocks)
        }
        StageGranularity::ThirteenMonthly => blocks == HOURS_PER_THIRTEEN_MONTH,
    });
    if hourly {
        TimeUnit::Hour
    } else {
        TimeUnit::Block
    }
}
