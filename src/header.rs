//! Binary header decoding and cell addressing for graf result files.
//!
//! A graf header is a sequence of fixed-size records framed by 4-byte
//! length markers (discarded on read). Three historical layouts exist,
//! selected by the leading version number; all of them decode into the
//! same [`GrafHeader`]. The header also owns the address arithmetic that
//! maps a `(stage, scenario, block)` cell to its byte position in the
//! data region.

use std::io::Read;
use std::path::Path;

use colored::Colorize;
use tracing::debug;

use crate::constants::{
    MAX_FORMAT_VERSION, MAX_NAME_BYTES, MIN_FORMAT_VERSION, UNITS_FIELD_LEN, WORD_SIZE,
};
use crate::error::{GrafError, Result};
use crate::models::{StageGranularity, TextEncoding, TimeUnit};

/// Decoded, immutable metadata describing one result file.
///
/// `block_offsets` has `stage_count + 1` entries, starts at zero, and is
/// non-decreasing; entry `i` is the number of blocks stored before the
/// stage at offset `i`, counted over one scenario.
#[derive(Debug, Clone)]
pub struct GrafHeader {
    pub format_version: i32,
    pub min_stage: i32,
    pub max_stage: i32,
    pub scenario_count: i32,
    pub varies_by_scenario: bool,
    pub varies_by_block: bool,
    pub time_unit: TimeUnit,
    pub stage_granularity: StageGranularity,
    pub initial_stage_of_case: i32,
    pub initial_year: i32,
    pub units: String,
    pub name_length: i32,
    pub agents: Vec<String>,
    pub block_offsets: Vec<i32>,
}

impl GrafHeader {
    /// Decode a header from `stream`, which must be positioned at the
    /// start of the header region. Returns the header together with the
    /// number of bytes consumed, which in single-file mode is the start
    /// of the data region.
    pub fn decode(
        stream: &mut impl Read,
        path: &Path,
        encoding: TextEncoding,
    ) -> Result<(Self, u64)> {
        let mut cursor = RecordCursor::new(stream, path);

        // Record 1: format version
        cursor.skip_marker()?;
        let format_version = cursor.read_i32()?;
        cursor.skip_marker()?;

        if !(MIN_FORMAT_VERSION..=MAX_FORMAT_VERSION).contains(&format_version) {
            return Err(GrafError::invalid_format(
                path,
                format!("unsupported binary format version {}", format_version),
            ));
        }

        // Record 2: counts, flags, calendar anchors, units, name length
        cursor.skip_marker()?;
        let counts = read_counts(&mut cursor, format_version)?;
        let units_bytes = cursor.read_bytes(UNITS_FIELD_LEN)?;
        let units = decode_text(&units_bytes, encoding, path)?
            .trim_end()
            .to_string();
        let name_length = cursor.read_i32()?;
        cursor.skip_marker()?;

        if counts.max_stage < counts.min_stage {
            return Err(GrafError::invalid_format(
                path,
                format!(
                    "empty stage range {}..={}",
                    counts.min_stage, counts.max_stage
                ),
            ));
        }

        let scenario_count = if counts.varies_by_scenario {
            counts.scenario_count
        } else {
            1
        };
        if scenario_count < 1 {
            return Err(GrafError::invalid_format(
                path,
                format!("scenario count must be positive, got {}", scenario_count),
            ));
        }
        if counts.agent_count < 0 {
            return Err(GrafError::invalid_format(
                path,
                format!("negative agent count {}", counts.agent_count),
            ));
        }

        let stage_granularity =
            StageGranularity::from_code(counts.granularity_code).ok_or_else(|| {
                GrafError::invalid_format(
                    path,
                    format!("unknown stage granularity code {}", counts.granularity_code),
                )
            })?;
        let time_unit = TimeUnit::from_code(counts.time_unit_code);

        // Record 3: block offsets, one entry per stage plus the total
        cursor.skip_marker()?;
        let stage_count = (counts.max_stage - counts.min_stage + 1) as i64;
        let mut block_offsets = Vec::new();
        for _ in 0..=stage_count {
            block_offsets.push(cursor.read_i32()?);
        }
        cursor.skip_marker()?;

        if block_offsets[0] != 0 {
            return Err(GrafError::invalid_format(
                path,
                format!("block offsets must start at zero, got {}", block_offsets[0]),
            ));
        }
        for i in 1..block_offsets.len() {
            if block_offsets[i] < block_offsets[i - 1] {
                return Err(GrafError::invalid_format(
                    path,
                    format!(
                        "block offsets decrease at stage {}",
                        counts.min_stage + i as i32 - 1
                    ),
                ));
            }
        }

        // Agent name records: length, bytes, 4 discarded padding bytes
        let mut agents = Vec::new();
        for i in 0..counts.agent_count {
            let length = cursor.read_i32()?;
            if length < 0 || length as usize > MAX_NAME_BYTES {
                return Err(GrafError::invalid_format(
                    path,
                    format!("agent {} has implausible name length {}", i + 1, length),
                ));
            }
            let name_bytes = cursor.read_bytes(length as usize)?;
            let name = decode_text(&name_bytes, encoding, path)?
                .trim_end()
                .to_string();
            agents.push(name);
            cursor.read_bytes(WORD_SIZE as usize)?;
        }

        let header = GrafHeader {
            format_version,
            min_stage: counts.min_stage,
            max_stage: counts.max_stage,
            scenario_count,
            varies_by_scenario: counts.varies_by_scenario,
            varies_by_block: counts.varies_by_block,
            time_unit,
            stage_granularity,
            initial_stage_of_case: counts.initial_stage_of_case,
            initial_year: counts.initial_year,
            units,
            name_length,
            agents,
            block_offsets,
        };

        debug!(
            "Decoded header v{} of {}: stages {}..={}, {} scenarios, {} agents",
            header.format_version,
            path.display(),
            header.min_stage,
            header.max_stage,
            header.scenario_count,
            header.agents.len()
        );

        Ok((header, cursor.position()))
    }

    pub fn stage_count(&self) -> i32 {
        self.max_stage - self.min_stage + 1
    }

    /// 0-based offset of a validated stage into `block_offsets`.
    fn stage_index(&self, stage: i32) -> usize {
        (stage - self.min_stage) as usize
    }

    /// Number of blocks in a validated stage.
    pub fn blocks_in_stage(&self, stage: i32) -> i32 {
        if self.varies_by_block {
            let i = self.stage_index(stage);
            self.block_offsets[i + 1] - self.block_offsets[i]
        } else {
            1
        }
    }

    /// Word index of a validated cell within the data region.
    ///
    /// Storage is row-major by (stage, scenario, block) with all agents
    /// contiguous per cell.
    pub fn cell_index(&self, stage: i32, scenario: i32, block: i32) -> u64 {
        let i = self.stage_index(stage);
        let cells_before = self.block_offsets[i] as u64 * self.scenario_count as u64
            + self.blocks_in_stage(stage) as u64 * (scenario as u64 - 1)
            + (block as u64 - 1);
        cells_before * self.agents.len() as u64
    }

    /// Byte position of a validated cell relative to the data file start.
    pub fn byte_offset(&self, data_region_start: u64, stage: i32, scenario: i32, block: i32) -> u64 {
        data_region_start + self.cell_index(stage, scenario, block) * WORD_SIZE
    }

    /// Total float32 words the data region must hold for this header.
    pub fn expected_data_words(&self) -> u64 {
        self.block_offsets[self.stage_count() as usize] as u64
            * self.scenario_count as u64
            * self.agents.len() as u64
    }

    /// Check the word-count invariant against the actual data region size.
    /// A mismatch means a truncated or foreign data file.
    pub fn validate_data_region(&self, data_len_bytes: u64, path: &Path) -> Result<()> {
        if data_len_bytes % WORD_SIZE != 0 {
            return Err(GrafError::invalid_format(
                path,
                format!("data region of {} bytes is not word aligned", data_len_bytes),
            ));
        }
        let words = data_len_bytes / WORD_SIZE;
        let expected = self.expected_data_words();
        if words != expected {
            return Err(GrafError::invalid_format(
                path,
                format!("data region holds {} words, header implies {}", words, expected),
            ));
        }
        Ok(())
    }

    pub fn validate_stage(&self, stage: i32) -> Result<()> {
        if stage < self.min_stage || stage > self.max_stage {
            return Err(GrafError::StageOutOfRange {
                stage,
                min: self.min_stage,
                max: self.max_stage,
            });
        }
        Ok(())
    }

    pub fn validate_scenario(&self, scenario: i32) -> Result<()> {
        if scenario < 1 || scenario > self.scenario_count {
            return Err(GrafError::ScenarioOutOfRange {
                scenario,
                count: self.scenario_count,
            });
        }
        Ok(())
    }

    /// Validate a block index. The stage must already be validated.
    pub fn validate_block(&self, stage: i32, block: i32) -> Result<()> {
        let count = self.blocks_in_stage(stage);
        if block < 1 || block > count {
            return Err(GrafError::BlockOutOfRange {
                block,
                count,
                stage,
            });
        }
        Ok(())
    }

    /// Validate a full cell key, dimension by dimension.
    pub fn validate_cell(&self, stage: i32, scenario: i32, block: i32) -> Result<()> {
        self.validate_stage(stage)?;
        self.validate_scenario(scenario)?;
        self.validate_block(stage, block)
    }

    /// Human-readable dump of the decoded fields.
    pub fn print_summary(&self, name: &str) {
        println!("{}", format!("Header of {}", name).bright_blue().bold());
        println!("  Format version:     {}", self.format_version);
        println!("  Stages:             {}..={}", self.min_stage, self.max_stage);
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
        println!("  Stored name length: {}", self.name_length);
    }
}

/// Counts/flags record in its version-independent form.
struct CountsRecord {
    min_stage: i32,
    max_stage: i32,
    scenario_count: i32,
    agent_count: i32,
    varies_by_scenario: bool,
    varies_by_block: bool,
    time_unit_code: i32,
    granularity_code: i32,
    initial_stage_of_case: i32,
    initial_year: i32,
}

fn read_counts<R: Read>(cursor: &mut RecordCursor<'_, R>, version: i32) -> Result<CountsRecord> {
    match version {
        // v1: single initial stage plus a count, no per-scenario flag.
        1 => {
            let initial_stage = cursor.read_i32()?;
            let stage_count = cursor.read_i32()?;
            let scenario_count = cursor.read_i32()?;
            let agent_count = cursor.read_i32()?;
            let varies_by_block = cursor.read_i32()?;
            let time_unit_code = cursor.read_i32()?;
            let granularity_code = cursor.read_i32()?;
            let initial_month = cursor.read_i32()?;
            let initial_year = cursor.read_i32()?;
            Ok(CountsRecord {
                min_stage: initial_stage,
                max_stage: initial_stage + stage_count - 1,
                scenario_count,
                agent_count,
                varies_by_scenario: scenario_count > 1,
                varies_by_block: varies_by_block != 0,
                time_unit_code,
                granularity_code,
                initial_stage_of_case: initial_month,
                initial_year,
            })
        }
        // v2: v1 plus an explicit per-scenario variation flag.
        2 => {
            let initial_stage = cursor.read_i32()?;
            let stage_count = cursor.read_i32()?;
            let scenario_count = cursor.read_i32()?;
            let agent_count = cursor.read_i32()?;
            let varies_by_scenario = cursor.read_i32()?;
            let varies_by_block = cursor.read_i32()?;
            let time_unit_code = cursor.read_i32()?;
            let granularity_code = cursor.read_i32()?;
            let initial_month = cursor.read_i32()?;
            let initial_year = cursor.read_i32()?;
            Ok(CountsRecord {
                min_stage: initial_stage,
                max_stage: initial_stage + stage_count - 1,
                scenario_count,
                agent_count,
                varies_by_scenario: varies_by_scenario != 0,
                varies_by_block: varies_by_block != 0,
                time_unit_code,
                granularity_code,
                initial_stage_of_case: initial_month,
                initial_year,
            })
        }
        // v3: explicit stage bounds and a case-level calendar anchor.
        3 => {
            let min_stage = cursor.read_i32()?;
            let max_stage = cursor.read_i32()?;
            let scenario_count = cursor.read_i32()?;
            let agent_count = cursor.read_i32()?;
            let varies_by_scenario = cursor.read_i32()?;
            let varies_by_block = cursor.read_i32()?;
            let time_unit_code = cursor.read_i32()?;
            let granularity_code = cursor.read_i32()?;
            let initial_stage_of_case = cursor.read_i32()?;
            let initial_year = cursor.read_i32()?;
            Ok(CountsRecord {
                min_stage,
                max_stage,
                scenario_count,
                agent_count,
                varies_by_scenario: varies_by_scenario != 0,
                varies_by_block: varies_by_block != 0,
                time_unit_code,
                granularity_code,
                initial_stage_of_case,
                initial_year,
            })
        }
        other => Err(GrafError::invalid_format(
            cursor.path,
            format!("unsupported binary format version {}", other),
        )),
    }
}

fn decode_text(bytes: &[u8], encoding: TextEncoding, path: &Path) -> Result<String> {
    encoding
        .decode(bytes)
        .map_err(|reason| GrafError::encoding(path, reason))
}

/// Byte-counting reader over the header region. Short reads surface as
/// format errors naming how far decoding got.
struct RecordCursor<'a, R: Read> {
    stream: &'a mut R,
    path: &'a Path,
    consumed: u64,
}

impl<'a, R: Read> RecordCursor<'a, R> {
    fn new(stream: &'a mut R, path: &'a Path) -> Self {
        Self {
            stream,
            path,
            consumed: 0,
        }
    }

    fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.stream.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                GrafError::invalid_format(
                    self.path,
                    format!("header truncated after {} bytes", self.consumed),
                )
            } else {
                GrafError::Io(e)
            }
        })?;
        self.consumed += buf.len() as u64;
        Ok(())
    }

    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf)?;
        Ok(buf)
    }

    fn skip_marker(&mut self) -> Result<()> {
        self.read_i32().map(|_| ())
    }

    fn position(&self) -> u64 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn push_i32(buf: &mut Vec<u8>, value: i32) {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    fn push_record(buf: &mut Vec<u8>, fields: &[i32]) {
        push_i32(buf, fields.len() as i32 * 4);
        for &field in fields {
            push_i32(buf, field);
        }
        push_i32(buf, fields.len() as i32 * 4);
    }

    fn push_counts_and_units(buf: &mut Vec<u8>, fields: &[i32], units: &[u8], name_length: i32) {
        let byte_len = fields.len() as i32 * 4 + UNITS_FIELD_LEN as i32 + 4;
        push_i32(buf, byte_len);
        for &field in fields {
            push_i32(buf, field);
        }
        let mut padded = units.to_vec();
        padded.resize(UNITS_FIELD_LEN, b' ');
        buf.extend_from_slice(&padded);
        push_i32(buf, name_length);
        push_i32(buf, byte_len);
    }

    fn push_agent(buf: &mut Vec<u8>, name: &[u8]) {
        push_i32(buf, name.len() as i32);
        buf.extend_from_slice(name);
        push_i32(buf, 0);
    }

    /// v3 header: stages 1..=3, 2 scenarios, blocks 2/3/4, agents A and B.
    fn sample_v3_header() -> Vec<u8> {
        let mut buf = Vec::new();
        push_record(&mut buf, &[3]);
        push_counts_and_units(&mut buf, &[1, 3, 2, 2, 1, 1, 0, 2, 1, 2021], b"MW", 12);
        push_record(&mut buf, &[0, 2, 5, 9]);
        push_agent(&mut buf, b"Agent A     ");
        push_agent(&mut buf, b"Agent B     ");
        buf
    }

    #[test]
    fn test_decode_v3() {
        let bytes = sample_v3_header();
        let (header, consumed) =
            GrafHeader::decode(&mut Cursor::new(&bytes), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert_eq!(header.format_version, 3);
        assert_eq!(header.min_stage, 1);
        assert_eq!(header.max_stage, 3);
        assert_eq!(header.stage_count(), 3);
        assert_eq!(header.scenario_count, 2);
        assert!(header.varies_by_scenario);
        assert!(header.varies_by_block);
        assert_eq!(header.time_unit, TimeUnit::Block);
        assert_eq!(header.stage_granularity, StageGranularity::Monthly);
        assert_eq!(header.initial_stage_of_case, 1);
        assert_eq!(header.initial_year, 2021);
        assert_eq!(header.units, "MW");
        assert_eq!(header.name_length, 12);
        assert_eq!(header.agents, vec!["Agent A", "Agent B"]);
        assert_eq!(header.block_offsets, vec![0, 2, 5, 9]);
        assert_eq!(consumed, bytes.len() as u64);
    }

    #[test]
    fn test_decode_v2() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[2]);
        // initial stage 1, 12 stages, 1 scenario, 1 agent, no variation,
        // hourly flag set, weekly stages anchored at week 5 of 2019
        push_counts_and_units(&mut buf, &[1, 12, 1, 1, 0, 0, 1, 1, 5, 2019], b"m3/s", 24);
        let offsets: Vec<i32> = (0..=12).collect();
        push_record(&mut buf, &offsets);
        push_agent(&mut buf, b"Inflow      ");

        let (header, _) =
            GrafHeader::decode(&mut Cursor::new(&buf), Path::new("inflow.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert_eq!(header.format_version, 2);
        assert_eq!(header.min_stage, 1);
        assert_eq!(header.max_stage, 12);
        assert_eq!(header.scenario_count, 1);
        assert!(!header.varies_by_scenario);
        assert!(!header.varies_by_block);
        assert_eq!(header.time_unit, TimeUnit::Hour);
        assert_eq!(header.stage_granularity, StageGranularity::Weekly);
        assert_eq!(header.initial_stage_of_case, 5);
        assert_eq!(header.agents, vec!["Inflow"]);
    }

    #[test]
    fn test_decode_v1_infers_scenario_variation() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[1]);
        // no varies_by_scenario field in this layout
        push_counts_and_units(&mut buf, &[1, 2, 30, 1, 0, 0, 2, 1, 2020], b"GWh", 12);
        push_record(&mut buf, &[0, 1, 2]);
        push_agent(&mut buf, b"Total       ");

        let (header, _) =
            GrafHeader::decode(&mut Cursor::new(&buf), Path::new("old.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert_eq!(header.format_version, 1);
        assert_eq!(header.scenario_count, 30);
        assert!(header.varies_by_scenario);
        assert_eq!(header.max_stage, 2);
    }

    #[test]
    fn test_scenario_count_forced_to_one() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[3]);
        // 200 declared scenarios but varies_by_scenario = 0
        push_counts_and_units(&mut buf, &[1, 3, 200, 1, 0, 1, 0, 2, 1, 2021], b"MW", 12);
        push_record(&mut buf, &[0, 1, 2, 3]);
        push_agent(&mut buf, b"Agent       ");

        let (header, _) =
            GrafHeader::decode(&mut Cursor::new(&buf), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert_eq!(header.scenario_count, 1);
        assert!(!header.varies_by_scenario);
    }

    #[test]
    fn test_unknown_granularity_code_rejected() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[3]);
        push_counts_and_units(&mut buf, &[1, 3, 2, 1, 1, 1, 0, 9, 1, 2021], b"MW", 12);
        push_record(&mut buf, &[0, 2, 5, 9]);
        push_agent(&mut buf, b"Agent       ");

        let err =
            GrafHeader::decode(&mut Cursor::new(&buf), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap_err();
        assert!(matches!(err, GrafError::InvalidFormat { .. }));
        assert!(err.to_string().contains("granularity"));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[9]);
        let err =
            GrafHeader::decode(&mut Cursor::new(&buf), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }

    #[test]
    fn test_truncated_header_is_format_error() {
        let bytes = sample_v3_header();
        let err = GrafHeader::decode(
            &mut Cursor::new(&bytes[..40]),
            Path::new("case.hdr"),
            TextEncoding::Utf8,
        )
        .unwrap_err();
        assert!(matches!(err, GrafError::InvalidFormat { .. }));
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_decreasing_offsets_rejected() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[3]);
        push_counts_and_units(&mut buf, &[1, 3, 2, 1, 1, 1, 0, 2, 1, 2021], b"MW", 12);
        push_record(&mut buf, &[0, 5, 3, 9]);
        push_agent(&mut buf, b"Agent       ");

        let err =
            GrafHeader::decode(&mut Cursor::new(&buf), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap_err();
        assert!(err.to_string().contains("decrease"));
    }

    #[test]
    fn test_latin1_agent_names() {
        let mut buf = Vec::new();
        push_record(&mut buf, &[3]);
        push_counts_and_units(&mut buf, &[1, 1, 1, 1, 1, 0, 0, 2, 1, 2021], b"MW", 12);
        push_record(&mut buf, &[0, 1]);
        push_agent(&mut buf, &[0x55, 0x73, 0x69, 0x6e, 0x61, 0xe7, 0x20, 0x20]);

        let err = GrafHeader::decode(
            &mut Cursor::new(&buf),
            Path::new("case.hdr"),
            TextEncoding::Utf8,
        )
        .unwrap_err();
        assert!(matches!(err, GrafError::Encoding { .. }));

        let (header, _) = GrafHeader::decode(
            &mut Cursor::new(&buf),
            Path::new("case.hdr"),
            TextEncoding::Latin1,
        )
        .unwrap();
        assert_eq!(header.agents, vec!["Usinaç"]);
    }

    #[test]
    fn test_blocks_in_stage_honors_variation_flag() {
        let bytes = sample_v3_header();
        let (mut header, _) =
            GrafHeader::decode(&mut Cursor::new(&bytes), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert_eq!(header.blocks_in_stage(1), 2);
        assert_eq!(header.blocks_in_stage(2), 3);
        assert_eq!(header.blocks_in_stage(3), 4);

        header.varies_by_block = false;
        assert_eq!(header.blocks_in_stage(2), 1);
    }

    #[test]
    fn test_cell_addressing() {
        let bytes = sample_v3_header();
        let (header, _) =
            GrafHeader::decode(&mut Cursor::new(&bytes), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap();

        // 2 agents, 2 scenarios, offsets [0, 2, 5, 9]
        assert_eq!(header.cell_index(1, 1, 1), 0);
        assert_eq!(header.cell_index(1, 1, 2), 2);
        assert_eq!(header.cell_index(1, 2, 1), 4);
        // stage 2: 2*2 prior cells, 3 blocks per scenario
        assert_eq!(header.cell_index(2, 1, 1), 8);
        assert_eq!(header.cell_index(2, 2, 3), (4 + 3 + 2) * 2);
        assert_eq!(header.byte_offset(100, 1, 1, 2), 100 + 2 * 4);

        assert_eq!(header.expected_data_words(), 9 * 2 * 2);
    }

    #[test]
    fn test_cell_validation_bounds() {
        let bytes = sample_v3_header();
        let (header, _) =
            GrafHeader::decode(&mut Cursor::new(&bytes), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert!(header.validate_cell(1, 1, 1).is_ok());
        assert!(header.validate_cell(3, 2, 4).is_ok());

        assert!(matches!(
            header.validate_cell(4, 1, 1),
            Err(GrafError::StageOutOfRange { stage: 4, .. })
        ));
        assert!(matches!(
            header.validate_cell(0, 1, 1),
            Err(GrafError::StageOutOfRange { .. })
        ));
        assert!(matches!(
            header.validate_cell(1, 3, 1),
            Err(GrafError::ScenarioOutOfRange { scenario: 3, .. })
        ));
        assert!(matches!(
            header.validate_cell(2, 1, 4),
            Err(GrafError::BlockOutOfRange {
                block: 4,
                count: 3,
                stage: 2
            })
        ));
    }

    #[test]
    fn test_data_region_validation() {
        let bytes = sample_v3_header();
        let (header, _) =
            GrafHeader::decode(&mut Cursor::new(&bytes), Path::new("case.hdr"), TextEncoding::Utf8)
                .unwrap();

        assert!(header.validate_data_region(36 * 4, Path::new("case.bin")).is_ok());
        assert!(header.validate_data_region(35 * 4, Path::new("case.bin")).is_err());
        assert!(header.validate_data_region(36 * 4 + 2, Path::new("case.bin")).is_err());
    }
}
