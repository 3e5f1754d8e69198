//! Streaming conversion of result files into parquet.
//!
//! The conversion runs as two blocking workers: a producer walks the
//! stage range chunk by chunk, assembling one column batch per chunk,
//! and a writer appends finished batches to a temporary `.part` file.
//! A capacity-1 channel sits between them, so at most one batch is
//! being assembled while one is being flushed, keeping peak memory
//! independent of input size. The final path only appears once every
//! submitted batch has been flushed, via an atomic rename.

pub mod chunk;
pub mod schema;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::{DataFrame, LazyFrame, ParquetWriter, StatisticsOptions, len};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, warn};

use self::chunk::{ColumnBatch, stage_chunks};
use self::schema::output_schema;
use crate::config::ConvertConfig;
use crate::constants::PART_SUFFIX;
use crate::error::{GrafError, Result};
use crate::models::{ConversionStats, OpenOptions};
use crate::reader::open_result_file;

/// Converts one result file at a time into a columnar output file.
pub struct Converter {
    config: ConvertConfig,
    open_options: OpenOptions,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self {
            config,
            open_options: OpenOptions::default(),
        }
    }

    /// Use non-default options (text encoding, metadata printout) when
    /// opening source files.
    pub fn with_open_options(mut self, open_options: OpenOptions) -> Self {
        self.open_options = open_options;
        self
    }

    /// Convert `input` into a parquet file at `output_path`.
    ///
    /// The output is written to `<output_path>.part` and renamed into
    /// place only after every chunk has been flushed; a failed
    /// conversion never leaves a partial file at the final path.
    pub async fn to_parquet(&self, input: &Path, output_path: &Path) -> Result<ConversionStats> {
        self.config.validate()?;
        let started = Instant::now();

        let open_options = self.open_options;
        let input_owned = input.to_path_buf();
        let reader = task::spawn_blocking(move || open_result_file(&input_owned, &open_options))
            .await
            .map_err(|e| worker_failed(input, e))??;

        let variable = reader.name().to_string();
        let agent_names = reader.agents().to_vec();
        let agent_count = agent_names.len();
        let schema = output_schema(&agent_names)?;
        let chunks = stage_chunks(
            reader.min_stage(),
            reader.max_stage(),
            self.config.stage_chunks,
        );

        let part = part_path(output_path);
        debug!(
            "Converting {} to {} in {} chunks",
            input.display(),
            part.display(),
            chunks.len()
        );

        let progress = build_progress(self.config.show_progress, chunks.len() as u64, &variable);

        let (tx, mut rx) = mpsc::channel::<DataFrame>(1);

        // The sink and its schema belong to the writer worker alone.
        let writer_config = self.config.clone();
        let writer_part = part.clone();
        let writer = task::spawn_blocking(move || -> Result<()> {
            let statistics = if writer_config.statistics {
                StatisticsOptions::full()
            } else {
                StatisticsOptions::empty()
            };
            let file = File::create(&writer_part)?;
            let mut sink = ParquetWriter::new(file)
                .with_compression(writer_config.compression.to_polars_compression())
                .with_statistics(statistics)
                .with_row_group_size(writer_config.row_group_size)
                .batched(&schema)?;
            while let Some(frame) = rx.blocking_recv() {
                sink.write_batch(&frame)?;
            }
            sink.finish()?;
            Ok(())
        });

        let producer_progress = progress.clone();
        let mut reader = reader;
        let producer = task::spawn_blocking(move || -> Result<(usize, usize)> {
            let mut rows = 0usize;
            let mut batches = 0usize;
            for stage_chunk in &chunks {
                let mut batch = ColumnBatch::new(&agent_names);
                for stage in stage_chunk.stages() {
                    let blocks = reader.blocks_in_stage(stage)? as usize;
                    for scenario in 1..=reader.scenario_count() {
                        let series = reader.read_grid(stage, scenario)?;
                        batch.append_grid(stage, scenario, blocks, series);
                    }
                }
                if !batch.is_empty() {
                    rows += batch.row_count();
                    batches += 1;
                    let frame = batch.into_frame()?;
                    if tx.blocking_send(frame).is_err() {
                        // Writer hung up; its error surfaces at join.
                        break;
                    }
                }
                producer_progress.inc(1);
            }
            drop(tx);
            reader.close()?;
            Ok((rows, batches))
        });

        let producer_outcome = producer.await.map_err(|e| worker_failed(input, e))?;
        let writer_outcome = writer.await.map_err(|e| worker_failed(input, e))?;
        let (rows_written, chunks_written) = producer_outcome?;
        writer_outcome?;

        progress.finish_and_clear();

        tokio::fs::rename(&part, output_path).await?;
        debug!(
            "Published {} ({} rows in {} chunks)",
            output_path.display(),
            rows_written,
            chunks_written
        );

        verify_published_rows(output_path, rows_written).await;

        Ok(ConversionStats {
            variable,
            output_path: output_path.to_path_buf(),
            rows_written,
            chunks_written,
            agent_count,
            elapsed_ms: started.elapsed().as_millis(),
        })
    }
}

/// Re-count rows of the published file and warn on disagreement. The
/// file is already live at this point, so a mismatch is diagnostic
/// rather than fatal.
async fn verify_published_rows(path: &Path, expected: usize) {
    match published_row_count(path).await {
        Ok(actual) if actual == expected => {
            debug!("Verified {} rows in {}", actual, path.display());
        }
        Ok(actual) => {
            warn!(
                "Row count mismatch in {}: submitted {} rows, file reports {}",
                path.display(),
                expected,
                actual
            );
        }
        Err(e) => {
            warn!("Could not verify row count of {}: {}", path.display(), e);
        }
    }
}

async fn published_row_count(path: &Path) -> Result<usize> {
    let count_frame = LazyFrame::scan_parquet(path, Default::default())?;
    let count_df = task::spawn_blocking(move || count_frame.select([len()]).collect())
        .await
        .map_err(|e| worker_failed(path, e))??;
    Ok(count_df
        .column("len")?
        .get(0)?
        .try_extract::<usize>()
        .unwrap_or(0))
}

fn part_path(output_path: &Path) -> PathBuf {
    let mut os = output_path.as_os_str().to_os_string();
    os.push(PART_SUFFIX);
    PathBuf::from(os)
}

fn worker_failed(path: &Path, e: task::JoinError) -> GrafError {
    GrafError::ConversionFailed {
        path: path.to_path_buf(),
        reason: format!("worker panicked: {}", e),
    }
}

fn build_progress(enabled: bool, chunks: u64, variable: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(chunks);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} chunks")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );
    bar.set_message(variable.to_string());
    bar
}
