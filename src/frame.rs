//! Projection of result readers into DataFrames and CSV.
//!
//! Walks a reader's full cell space in stage, scenario, block order and
//! materializes one row per cell, with optional allow-list filters on
//! every dimension, a choice of key layout, and calendar period keys
//! derived from the stage index.

use std::fs::File;
use std::path::Path;

use clap::ValueEnum;
use polars::prelude::{Column, CsvWriter, DataFrame, SerWriter};
use tracing::{debug, warn};

use crate::constants::columns::{BLOCK, CELL, SCENARIO, STAGE, YEAR};
use crate::error::{GrafError, Result};
use crate::models::period_of;
use crate::reader::ResultReader;

/// How the key dimensions appear in a projected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeyLayout {
    /// Leading integer columns, one per key dimension
    #[default]
    Flat,
    /// One leading string column joining the key dimensions with `:`
    Composite,
}

/// Projection options.
#[derive(Debug, Clone, Default)]
pub struct FrameOptions {
    /// Keep only these agents (case-insensitive, trimmed match);
    /// output columns follow the filter's order
    pub agents: Option<Vec<String>>,
    /// Keep only these stages
    pub stages: Option<Vec<i32>>,
    /// Keep only these scenarios
    pub scenarios: Option<Vec<i32>>,
    /// Keep only these blocks
    pub blocks: Option<Vec<i32>>,
    /// Key column layout
    pub key_layout: KeyLayout,
    /// Replace the stage key with calendar year and period columns
    pub period_key: bool,
}

impl FrameOptions {
    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn with_stages(mut self, stages: Vec<i32>) -> Self {
        self.stages = Some(stages);
        self
    }

    pub fn with_scenarios(mut self, scenarios: Vec<i32>) -> Self {
        self.scenarios = Some(scenarios);
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<i32>) -> Self {
        self.blocks = Some(blocks);
        self
    }

    pub fn with_key_layout(mut self, key_layout: KeyLayout) -> Self {
        self.key_layout = key_layout;
        self
    }

    pub fn with_period_key(mut self) -> Self {
        self.period_key = true;
        self
    }
}

/// Materialize a reader's cell space as one DataFrame.
///
/// Row order is stage, then scenario, then block, matching the storage
/// order of the binaries. Every cell the filters admit becomes exactly
/// one row.
pub fn load_dataframe(reader: &mut dyn ResultReader, options: &FrameOptions) -> Result<DataFrame> {
    let selection = select_agents(reader.agents(), options.agents.as_deref())?;
    let agent_names: Vec<String> = selection
        .iter()
        .map(|&index| reader.agents()[index].clone())
        .collect();

    let granularity = reader.stage_granularity();
    let initial_stage_of_case = reader.initial_stage_of_case();
    let initial_year = reader.initial_year();

    let stage_filter = options.stages.as_deref();
    let scenario_filter = options.scenarios.as_deref();
    let block_filter = options.blocks.as_deref();

    let mut stages_col: Vec<i64> = Vec::new();
    let mut scenarios_col: Vec<i64> = Vec::new();
    let mut blocks_col: Vec<i64> = Vec::new();
    let mut years_col: Vec<i64> = Vec::new();
    let mut periods_col: Vec<i64> = Vec::new();
    let mut agent_cols: Vec<Vec<f32>> = selection.iter().map(|_| Vec::new()).collect();

    for stage in reader.min_stage()..=reader.max_stage() {
        if !allowed(stage_filter, stage) {
            continue;
        }
        let blocks_in_stage = reader.blocks_in_stage(stage)?;
        let (year, period) = period_of(stage, granularity, initial_stage_of_case, initial_year);
        for scenario in 1..=reader.scenario_count() {
            if !allowed(scenario_filter, scenario) {
                continue;
            }
            let grid = reader.read_grid(stage, scenario)?;
            for block in 1..=blocks_in_stage {
                if !allowed(block_filter, block) {
                    continue;
                }
                stages_col.push(stage as i64);
                scenarios_col.push(scenario as i64);
                blocks_col.push(block as i64);
                years_col.push(year as i64);
                periods_col.push(period as i64);
                for (slot, &agent_index) in selection.iter().enumerate() {
                    agent_cols[slot].push(grid[agent_index][(block - 1) as usize]);
                }
            }
        }
    }

    let mut cols: Vec<Column> = Vec::with_capacity(agent_names.len() + 4);
    match (options.key_layout, options.period_key) {
        (KeyLayout::Flat, false) => {
            cols.push(Column::new(STAGE.into(), stages_col));
            cols.push(Column::new(SCENARIO.into(), scenarios_col));
            cols.push(Column::new(BLOCK.into(), blocks_col));
        }
        (KeyLayout::Flat, true) => {
            cols.push(Column::new(YEAR.into(), years_col));
            cols.push(Column::new(granularity.period_column().into(), periods_col));
            cols.push(Column::new(SCENARIO.into(), scenarios_col));
            cols.push(Column::new(BLOCK.into(), blocks_col));
        }
        (KeyLayout::Composite, false) => {
            let keys: Vec<String> = stages_col
                .iter()
                .zip(&scenarios_col)
                .zip(&blocks_col)
                .map(|((stage, scenario), block)| format!("{}:{}:{}", stage, scenario, block))
                .collect();
            cols.push(Column::new(CELL.into(), keys));
        }
        (KeyLayout::Composite, true) => {
            let keys: Vec<String> = years_col
                .iter()
                .zip(&periods_col)
                .zip(&scenarios_col)
                .zip(&blocks_col)
                .map(|(((year, period), scenario), block)| {
                    format!("{}:{}:{}:{}", year, period, scenario, block)
                })
                .collect();
            cols.push(Column::new(CELL.into(), keys));
        }
    }
    for (name, values) in agent_names.iter().zip(agent_cols) {
        cols.push(Column::new(name.as_str().into(), values));
    }

    Ok(DataFrame::new(cols)?)
}

/// Project a reader into a CSV file. Returns the number of data rows.
pub fn export_csv(
    reader: &mut dyn ResultReader,
    output_path: &Path,
    options: &FrameOptions,
) -> Result<usize> {
    let mut frame = load_dataframe(reader, options)?;
    let file = File::create(output_path)?;
    CsvWriter::new(file).finish(&mut frame)?;
    debug!("Wrote {} rows to {}", frame.height(), output_path.display());
    Ok(frame.height())
}

/// Resolve an agent allow-list to indices into the declared list.
/// Unknown names are logged and skipped; matching nothing at all is an
/// error since the projection would have no value columns.
fn select_agents(declared: &[String], requested: Option<&[String]>) -> Result<Vec<usize>> {
    let Some(requested) = requested else {
        return Ok((0..declared.len()).collect());
    };
    let mut indices = Vec::new();
    for name in requested {
        let wanted = name.trim();
        match declared
            .iter()
            .position(|agent| agent.trim().eq_ignore_ascii_case(wanted))
        {
            Some(index) if !indices.contains(&index) => indices.push(index),
            Some(_) => {}
            None => warn!("Agent '{}' not found, skipping", wanted),
        }
    }
    if indices.is_empty() {
        return Err(GrafError::configuration(
            "agent filter matched none of the declared agents",
        ));
    }
    Ok(indices)
}

fn allowed(filter: Option<&[i32]>, value: i32) -> bool {
    filter.map_or(true, |list| list.contains(&value))
}
