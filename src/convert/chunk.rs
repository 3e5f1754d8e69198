//! Stage-range partitioning and per-chunk column buffers.

use polars::prelude::{Column, DataFrame};

use crate::constants::columns::{BLOCK, SCENARIO, STAGE};
use crate::error::Result;

/// Contiguous inclusive stage range produced by [`stage_chunks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageChunk {
    pub first: i32,
    pub last: i32,
}

impl StageChunk {
    pub fn stages(&self) -> impl Iterator<Item = i32> {
        self.first..=self.last
    }
}

/// Split the inclusive stage range into at most `parts` contiguous
/// chunks with sizes differing by at most one, earlier chunks taking
/// the larger size, together covering the range exactly once.
pub fn stage_chunks(min_stage: i32, max_stage: i32, parts: usize) -> Vec<StageChunk> {
    if max_stage < min_stage || parts == 0 {
        return Vec::new();
    }
    let n = (max_stage - min_stage + 1) as usize;
    let base = n / parts;
    let extra = n % parts;

    let mut chunks = Vec::with_capacity(parts.min(n));
    let mut next = min_stage;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        if size == 0 {
            break;
        }
        let first = next;
        let last = first + size as i32 - 1;
        chunks.push(StageChunk { first, last });
        next = last + 1;
    }
    chunks
}

/// Column buffers for one chunk, filled in stage, scenario, block
/// traversal order and drained into a [`DataFrame`] once full.
pub struct ColumnBatch {
    stages: Vec<i64>,
    scenarios: Vec<i64>,
    blocks: Vec<i64>,
    agents: Vec<Vec<f32>>,
    agent_names: Vec<String>,
}

impl ColumnBatch {
    pub fn new(agent_names: &[String]) -> Self {
        Self {
            stages: Vec::new(),
            scenarios: Vec::new(),
            blocks: Vec::new(),
            agents: agent_names.iter().map(|_| Vec::new()).collect(),
            agent_names: agent_names.to_vec(),
        }
    }

    /// Append one `(stage, scenario)` grid. `series` holds one
    /// block-ordered vector per agent, each `blocks` long.
    pub fn append_grid(&mut self, stage: i32, scenario: i32, blocks: usize, series: Vec<Vec<f32>>) {
        for block in 1..=blocks {
            self.stages.push(stage as i64);
            self.scenarios.push(scenario as i64);
            self.blocks.push(block as i64);
        }
        for (column, values) in self.agents.iter_mut().zip(series) {
            column.extend(values);
        }
    }

    pub fn row_count(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn into_frame(self) -> Result<DataFrame> {
        let mut cols = Vec::with_capacity(self.agent_names.len() + 3);
        cols.push(Column::new(STAGE.into(), self.stages));
        cols.push(Column::new(SCENARIO.into(), self.scenarios));
        cols.push(Column::new(BLOCK.into(), self.blocks));
        for (name, values) in self.agent_names.iter().zip(self.agents) {
            cols.push(Column::new(name.as_str().into(), values));
        }
        Ok(DataFrame::new(cols)?)
    }
}
