//! Random-access reader over graf binary result files.
//!
//! The data region is a flat little-endian float32 grid; every read
//! seeks to an absolute offset computed from the header, so reads are
//! idempotent and independent of prior calls on the same handle.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::{DATA_EXTENSION, HEADER_EXTENSION, WORD_SIZE};
use crate::error::{GrafError, Result};
use crate::header::GrafHeader;
use crate::models::{OpenOptions, StageGranularity, TimeUnit};
use crate::reader::ResultReader;

/// Reader over a binary result grid, either an `hdr`/`bin` pair or a
/// single file carrying the header and the data back to back.
pub struct BinReader {
    name: String,
    header: GrafHeader,
    data: Option<File>,
    data_path: PathBuf,
    data_region_start: u64,
}

impl BinReader {
    /// Open a binary result. Paths ending in `hdr` or `bin`, and bare
    /// stems sitting next to such a pair, select paired mode; any other
    /// existing file is read as a single-file binary.
    pub fn open(path: &Path, options: &OpenOptions) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let reader = match ext.as_deref() {
            Some(HEADER_EXTENSION) | Some(DATA_EXTENSION) => Self::open_paired(path, options)?,
            _ if path.exists() => Self::open_single(path, options)?,
            _ if path.with_extension(HEADER_EXTENSION).exists() => {
                Self::open_paired(&path.with_extension(HEADER_EXTENSION), options)?
            }
            _ => {
                return Err(GrafError::FileNotFound {
                    path: path.to_path_buf(),
                });
            }
        };

        if options.print_metadata {
            reader.header.print_summary(&reader.name);
        }
        Ok(reader)
    }

    fn open_paired(path: &Path, options: &OpenOptions) -> Result<Self> {
        let header_path = path.with_extension(HEADER_EXTENSION);
        let data_path = path.with_extension(DATA_EXTENSION);
        if !header_path.exists() {
            return Err(GrafError::FileNotFound { path: header_path });
        }
        if !data_path.exists() {
            return Err(GrafError::FileNotFound { path: data_path });
        }

        let mut stream = BufReader::new(File::open(&header_path)?);
        let (header, _) = GrafHeader::decode(&mut stream, &header_path, options.encoding)?;

        let data = File::open(&data_path)?;
        header.validate_data_region(data.metadata()?.len(), &data_path)?;

        debug!(
            "Opened {} + {}: {} agents, stages {}..={}",
            header_path.display(),
            data_path.display(),
            header.agents.len(),
            header.min_stage,
            header.max_stage
        );

        Ok(Self {
            name: variable_name(&header_path),
            header,
            data: Some(data),
            data_path,
            data_region_start: 0,
        })
    }

    fn open_single(path: &Path, options: &OpenOptions) -> Result<Self> {
        let mut stream = BufReader::new(File::open(path)?);
        let (header, data_region_start) = GrafHeader::decode(&mut stream, path, options.encoding)?;

        // Drop the buffer so reads below see the file's real position.
        let data = stream.into_inner();
        let file_len = data.metadata()?.len();
        header.validate_data_region(file_len.saturating_sub(data_region_start), path)?;

        debug!(
            "Opened single-file binary {}: data region starts at byte {}",
            path.display(),
            data_region_start
        );

        Ok(Self {
            name: variable_name(path),
            header,
            data: Some(data),
            data_path: path.to_path_buf(),
            data_region_start,
        })
    }

    /// Seek to `byte_offset` and decode `count` little-endian floats.
    fn read_words(&mut self, byte_offset: u64, count: usize) -> Result<Vec<f32>> {
        let file = self.data.as_mut().ok_or_else(|| GrafError::ReaderClosed {
            path: self.data_path.clone(),
        })?;
        file.seek(SeekFrom::Start(byte_offset))?;

        let mut buf = vec![0u8; count * WORD_SIZE as usize];
        file.read_exact(&mut buf)?;

        let mut values = Vec::with_capacity(count);
        for word in buf.chunks_exact(WORD_SIZE as usize) {
            values.push(f32::from_le_bytes([word[0], word[1], word[2], word[3]]));
        }
        Ok(values)
    }
}

impl ResultReader for BinReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn units(&self) -> &str {
        &self.header.units
    }

    fn agents(&self) -> &[String] {
        &self.header.agents
    }

    fn min_stage(&self) -> i32 {
        self.header.min_stage
    }

    fn max_stage(&self) -> i32 {
        self.header.max_stage
    }

    fn scenario_count(&self) -> i32 {
        self.header.scenario_count
    }

    fn time_unit(&self) -> TimeUnit {
        self.header.time_unit
    }

    fn stage_granularity(&self) -> StageGranularity {
        self.header.stage_granularity
    }

    fn initial_stage_of_case(&self) -> i32 {
        self.header.initial_stage_of_case
    }

    fn initial_year(&self) -> i32 {
        self.header.initial_year
    }

    fn blocks_in_stage(&self, stage: i32) -> Result<i32> {
        self.header.validate_stage(stage)?;
        Ok(self.header.blocks_in_stage(stage))
    }

    fn read(&mut self, stage: i32, scenario: i32, block: i32) -> Result<Vec<f32>> {
        self.header.validate_cell(stage, scenario, block)?;
        let offset = self
            .header
            .byte_offset(self.data_region_start, stage, scenario, block);
        self.read_words(offset, self.header.agents.len())
    }

    fn read_grid(&mut self, stage: i32, scenario: i32) -> Result<Vec<Vec<f32>>> {
        self.header.validate_stage(stage)?;
        self.header.validate_scenario(scenario)?;

        let blocks = self.header.blocks_in_stage(stage) as usize;
        let agent_count = self.header.agents.len();
        let offset = self
            .header
            .byte_offset(self.data_region_start, stage, scenario, 1);
        let raw = self.read_words(offset, blocks * agent_count)?;

        Ok(de_interleave(&raw, agent_count, blocks))
    }

    fn close(&mut self) -> Result<()> {
        if self.data.take().is_some() {
            debug!("Closed {}", self.data_path.display());
        }
        Ok(())
    }
}

fn variable_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Split a block-major interleaved buffer (`[b0a0, b0a1, .., b1a0, ..]`)
/// into one block-ordered series per agent.
fn de_interleave(raw: &[f32], agent_count: usize, blocks: usize) -> Vec<Vec<f32>> {
    let mut per_agent: Vec<Vec<f32>> = (0..agent_count)
        .map(|_| Vec::with_capacity(blocks))
        .collect();
    for (i, &value) in raw.iter().enumerate() {
        per_agent[i % agent_count].push(value);
    }
    per_agent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_de_interleave() {
        // 3 blocks of 2 agents
        let raw = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let series = de_interleave(&raw, 2, 3);
        assert_eq!(series, vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]);
    }

    #[test]
    fn test_de_interleave_no_agents() {
        assert!(de_interleave(&[], 0, 0).is_empty());
    }

    #[test]
    fn test_missing_header_named_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = BinReader::open(&dir.path().join("cmgbus.hdr"), &OpenOptions::new()).unwrap_err();
        match err {
            GrafError::FileNotFound { path } => assert!(path.ends_with("cmgbus.hdr")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_companion_named_in_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cmgbus.hdr"), b"").unwrap();
        let err = BinReader::open(&dir.path().join("cmgbus.hdr"), &OpenOptions::new()).unwrap_err();
        match err {
            GrafError::FileNotFound { path } => assert!(path.ends_with("cmgbus.bin")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_bare_path_named_in_error() {
        let dir = tempfile::tempdir().unwrap();
        let err =
            BinReader::open(&dir.path().join("cmgbus.graf"), &OpenOptions::new()).unwrap_err();
        match err {
            GrafError::FileNotFound { path } => assert!(path.ends_with("cmgbus.graf")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
