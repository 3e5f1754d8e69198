//! Integration tests for the streaming parquet conversion.
//!
//! Each test writes a binary fixture pair, runs the converter against
//! it, then reads the published parquet file back and checks schema,
//! row order and cell values against the generating function.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use graf_processor::{CompressionAlgorithm, ConvertConfig, Converter, GrafError};
use polars::prelude::{DataFrame, DataType, ParquetReader, SerReader};
use tempfile::TempDir;

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

/// Deterministic cell value: exact in f32 for every index used here.
fn cell_value(stage: i32, scenario: i32, block: i32, agent: usize) -> f32 {
    (stage * 1_000_000 + scenario * 10_000 + block * 100 + agent as i32) as f32
}

/// Write a v3 header/data pair under `dir` and return the header path.
///
/// Blocks per stage come from `blocks_per_stage` (all 1 means a fixed
/// layout), scenarios and agents as given, monthly horizon from
/// January 2021, values from [`cell_value`].
fn write_case_variable(
    dir: &Path,
    stem: &str,
    blocks_per_stage: &[i32],
    scenario_count: i32,
    agents: &[&str],
) -> std::io::Result<PathBuf> {
    let varies_by_block = blocks_per_stage.iter().any(|&b| b != 1);
    let stage_count = blocks_per_stage.len() as i32;

    let mut header = Vec::new();
    push_record(&mut header, &[3]);

    let counts = [
        1,
        stage_count,
        scenario_count,
        agents.len() as i32,
        (scenario_count > 1) as i32,
        varies_by_block as i32,
        0,
        2,
        1,
        2021,
    ];
    let byte_len = counts.len() as i32 * 4 + 7 + 4;
    push_i32(&mut header, byte_len);
    for &field in &counts {
        push_i32(&mut header, field);
    }
    header.extend_from_slice(b"MW     ");
    push_i32(&mut header, 12);
    push_i32(&mut header, byte_len);

    let mut offsets = vec![0i32];
    for &blocks in blocks_per_stage {
        offsets.push(offsets.last().copied().unwrap_or(0) + blocks);
    }
    push_record(&mut header, &offsets);

    for agent in agents {
        let mut bytes = agent.as_bytes().to_vec();
        bytes.resize(12, b' ');
        push_i32(&mut header, bytes.len() as i32);
        header.extend_from_slice(&bytes);
        push_i32(&mut header, bytes.len() as i32);
    }

    let mut data = Vec::new();
    for (index, &blocks) in blocks_per_stage.iter().enumerate() {
        let stage = index as i32 + 1;
        for scenario in 1..=scenario_count {
            for block in 1..=blocks {
                for agent in 0..agents.len() {
                    let value = cell_value(stage, scenario, block, agent);
                    data.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    let header_path = dir.join(format!("{stem}.hdr"));
    fs::write(&header_path, header)?;
    fs::write(dir.join(format!("{stem}.bin")), data)?;
    Ok(header_path)
}

fn read_parquet(path: &Path) -> DataFrame {
    ParquetReader::new(File::open(path).unwrap())
        .finish()
        .unwrap()
}

fn i64_column(frame: &DataFrame, name: &str) -> Vec<i64> {
    (0..frame.height())
        .map(|i| {
            frame
                .column(name)
                .unwrap()
                .get(i)
                .unwrap()
                .try_extract::<i64>()
                .unwrap()
        })
        .collect()
}

fn f32_at(frame: &DataFrame, name: &str, row: usize) -> f32 {
    frame
        .column(name)
        .unwrap()
        .get(row)
        .unwrap()
        .try_extract::<f32>()
        .unwrap()
}

#[tokio::test]
async fn test_round_trip_values() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_case_variable(
        dir.path(),
        "gerter",
        &[2, 3, 4],
        2,
        &["Thermal 1", "Hydro 1"],
    )?;
    let output = dir.path().join("gerter.parquet");

    let config = ConvertConfig::default()
        .with_stage_chunks(2)
        .with_compression(CompressionAlgorithm::Zstd);
    let stats = Converter::new(config).to_parquet(&input, &output).await?;

    assert_eq!(stats.variable, "gerter");
    assert_eq!(stats.rows_written, 18);
    assert_eq!(stats.chunks_written, 2);
    assert_eq!(stats.agent_count, 2);
    assert_eq!(stats.output_path, output);

    let frame = read_parquet(&output);
    assert_eq!(frame.height(), 18);
    let names: Vec<&str> = frame
        .get_columns()
        .iter()
        .map(|c| c.name().as_str())
        .collect();
    assert_eq!(names, ["stage", "scenario", "block", "Thermal 1", "Hydro 1"]);
    assert_eq!(frame.column("stage")?.dtype(), &DataType::Int64);
    assert_eq!(frame.column("block")?.dtype(), &DataType::Int64);
    assert_eq!(frame.column("Thermal 1")?.dtype(), &DataType::Float32);

    // Rows follow stage, scenario, block traversal order.
    let stages = i64_column(&frame, "stage");
    let scenarios = i64_column(&frame, "scenario");
    let blocks = i64_column(&frame, "block");
    assert_eq!(
        stages,
        vec![1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3]
    );
    assert_eq!(
        scenarios,
        vec![1, 1, 2, 2, 1, 1, 1, 2, 2, 2, 1, 1, 1, 1, 2, 2, 2, 2]
    );
    assert_eq!(
        blocks,
        vec![1, 2, 1, 2, 1, 2, 3, 1, 2, 3, 1, 2, 3, 4, 1, 2, 3, 4]
    );

    for row in 0..frame.height() {
        let stage = stages[row] as i32;
        let scenario = scenarios[row] as i32;
        let block = blocks[row] as i32;
        assert_eq!(
            f32_at(&frame, "Thermal 1", row),
            cell_value(stage, scenario, block, 0)
        );
        assert_eq!(
            f32_at(&frame, "Hydro 1", row),
            cell_value(stage, scenario, block, 1)
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_flat_single_scenario_case() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_case_variable(
        dir.path(),
        "coster",
        &[1; 12],
        1,
        &["System", "North", "South"],
    )?;
    let output = dir.path().join("coster.parquet");

    let config = ConvertConfig::default()
        .without_statistics()
        .with_row_group_size(Some(4));
    let stats = Converter::new(config).to_parquet(&input, &output).await?;

    assert_eq!(stats.rows_written, 12);
    assert_eq!(stats.chunks_written, 10);

    let frame = read_parquet(&output);
    assert_eq!(frame.height(), 12);
    assert_eq!(i64_column(&frame, "stage"), (1..=12).collect::<Vec<i64>>());
    assert!(i64_column(&frame, "scenario").iter().all(|&s| s == 1));
    assert!(i64_column(&frame, "block").iter().all(|&b| b == 1));
    assert_eq!(f32_at(&frame, "South", 11), cell_value(12, 1, 1, 2));
    Ok(())
}

#[tokio::test]
async fn test_success_leaves_no_part_file() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_case_variable(dir.path(), "gerter", &[2], 1, &["A"])?;
    let output = dir.path().join("gerter.parquet");

    Converter::new(ConvertConfig::default())
        .to_parquet(&input, &output)
        .await?;

    assert!(output.exists());
    assert!(!dir.path().join("gerter.parquet.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_input_fails_cleanly() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let output = dir.path().join("absent.parquet");

    let result = Converter::new(ConvertConfig::default())
        .to_parquet(&dir.path().join("absent"), &output)
        .await;

    assert!(matches!(result, Err(GrafError::FileNotFound { .. })));
    assert!(!output.exists());
    assert!(!dir.path().join("absent.parquet.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_truncated_input_fails_cleanly() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_case_variable(dir.path(), "gerter", &[2, 3], 2, &["A", "B"])?;
    let data_path = dir.path().join("gerter.bin");
    let data = fs::read(&data_path)?;
    fs::write(&data_path, &data[..data.len() - 4])?;
    let output = dir.path().join("gerter.parquet");

    let result = Converter::new(ConvertConfig::default())
        .to_parquet(&input, &output)
        .await;

    assert!(matches!(result, Err(GrafError::InvalidFormat { .. })));
    assert!(!output.exists());
    assert!(!dir.path().join("gerter.parquet.part").exists());
    Ok(())
}

#[tokio::test]
async fn test_overwrite_existing_output() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let input = write_case_variable(dir.path(), "gerter", &[2, 3, 4], 2, &["A", "B"])?;
    let output = dir.path().join("gerter.parquet");
    fs::write(&output, b"stale")?;

    Converter::new(ConvertConfig::default())
        .to_parquet(&input, &output)
        .await?;

    assert_eq!(read_parquet(&output).height(), 18);
    Ok(())
}

#[tokio::test]
async fn test_table_input_converts() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let table_path = dir.path().join("demand.csv");
    fs::write(
        &table_path,
        "1, GWh, 2, 1, 2020\n\
         0\n\
         1\n\
         stage, scenario, block, Load\n\
         1, 1, 1, 10.5\n\
         1, 1, 2, 11.5\n\
         2, 1, 1, 12.5\n",
    )?;
    let output = dir.path().join("demand.parquet");

    let stats = Converter::new(ConvertConfig::default())
        .to_parquet(&table_path, &output)
        .await?;
    assert_eq!(stats.variable, "demand");
    assert_eq!(stats.rows_written, 3);

    let frame = read_parquet(&output);
    assert_eq!(frame.height(), 3);
    assert_eq!(f32_at(&frame, "Load", 2), 12.5);
    Ok(())
}
