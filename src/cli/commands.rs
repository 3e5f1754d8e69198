//! Command implementations for the graf processor CLI.
//!
//! Main command execution logic: batch conversion orchestration, CSV
//! export, header inspection, and final report rendering.

use std::path::Path;
use std::time::{Duration, Instant};

use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::HumanDuration;
use tracing::{debug, error, info};

use crate::cli::args::{Args, Commands, ConvertArgs, CsvArgs, InfoArgs, OutputFormat};
use crate::constants::{parquet_output_name, HEADER_EXTENSION};
use crate::convert::Converter;
use crate::error::{GrafError, Result};
use crate::frame::export_csv;
use crate::models::{BatchSummary, ConversionStats, FailedVariable};
use crate::reader::open_result_file;

/// Outcome of one variable inside a batch run.
enum JobOutcome {
    Converted(ConversionStats),
    Skipped,
    Failed(String),
}

/// Main command dispatcher for the graf processor.
pub async fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Convert(convert_args) => {
            setup_logging(convert_args.get_log_level())?;
            convert_args.validate()?;
            let summary = run_convert(&convert_args).await?;
            report_convert(&convert_args, &summary)
        }
        Commands::Csv(csv_args) => {
            setup_logging(csv_args.get_log_level())?;
            run_export(&csv_args).await
        }
        Commands::Info(info_args) => {
            setup_logging(info_args.get_log_level())?;
            run_info(&info_args).await
        }
    }
}

/// Convert a batch of result variables to Parquet.
///
/// Variables run through a bounded pool of concurrent conversions. One
/// failing variable is reported and does not stop the others; the run
/// only errors out when every variable failed.
async fn run_convert(args: &ConvertArgs) -> Result<BatchSummary> {
    let started = Instant::now();

    let variables = if args.all {
        discover_variables(&args.case_path)?
    } else {
        args.get_variables()
    };
    if variables.is_empty() {
        return Err(GrafError::configuration(format!(
            "No result files found in {}",
            args.case_path.display()
        )));
    }

    let output_dir = args.output_dir();
    tokio::fs::create_dir_all(&output_dir).await?;

    println!(
        "{}",
        "Converting graf results to Parquet".bright_green().bold()
    );
    println!("  {} {}", "Case:".bright_cyan(), args.case_path.display());
    println!("  {} {}", "Output:".bright_cyan(), output_dir.display());
    println!(
        "  {} {}",
        "Variables:".bright_cyan(),
        variables.join(", ").bright_white()
    );
    println!();

    let config = args.to_convert_config();
    config.validate()?;
    let converter = Converter::new(config).with_open_options(args.open_options());
    let force = args.force;

    let jobs = variables.iter().map(|variable| {
        let variable = variable.clone();
        let input = args.case_path.join(&variable);
        let output = output_dir.join(parquet_output_name(output_stem(&variable)));
        let converter = &converter;
        async move {
            if !force && output.exists() {
                info!("Output {} already exists, skipping", output.display());
                println!(
                    "  {} {}: output already exists",
                    "Skipping".bright_yellow(),
                    variable
                );
                return (variable, JobOutcome::Skipped);
            }
            info!("Converting {} to {}", input.display(), output.display());
            let outcome = match converter.to_parquet(&input, &output).await {
                Ok(stats) => {
                    println!(
                        "  {} {} in {:.2}s ({} rows)",
                        "Converted".bright_green(),
                        variable.bright_white(),
                        stats.elapsed_ms as f64 / 1000.0,
                        stats.rows_written
                    );
                    JobOutcome::Converted(stats)
                }
                Err(e) => {
                    error!("Failed to convert {}: {}", variable, e);
                    println!("  {} {}: {}", "Failed".bright_red(), variable.bright_red(), e);
                    JobOutcome::Failed(e.to_string())
                }
            };
            (variable, outcome)
        }
    });

    let outcomes: Vec<(String, JobOutcome)> = stream::iter(jobs)
        .buffer_unordered(args.effective_workers())
        .collect()
        .await;

    let mut summary = BatchSummary::default();
    for (variable, outcome) in outcomes {
        match outcome {
            JobOutcome::Converted(stats) => summary.converted.push(stats),
            JobOutcome::Skipped => summary.skipped.push(variable),
            JobOutcome::Failed(error) => summary.failed.push(FailedVariable { variable, error }),
        }
    }
    summary.elapsed_ms = started.elapsed().as_millis();

    if summary.converted.is_empty() && summary.skipped.is_empty() && !summary.failed.is_empty() {
        return Err(GrafError::ConversionFailed {
            path: args.case_path.clone(),
            reason: format!("all {} variables failed", summary.failed.len()),
        });
    }

    Ok(summary)
}

/// Export one result file as a CSV projection.
async fn run_export(args: &CsvArgs) -> Result<()> {
    let started = Instant::now();
    let input = args.input.clone();
    let output = args
        .output_path
        .clone()
        .unwrap_or_else(|| args.default_output());

    if output == input {
        return Err(GrafError::configuration(format!(
            "Output {} would overwrite the input, use --output",
            output.display()
        )));
    }

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let options = args.frame_options();
    let open_options = args.open_options();
    let worker_input = input.clone();
    let worker_output = output.clone();
    let (variable, rows) =
        tokio::task::spawn_blocking(move || -> Result<(String, usize)> {
            let mut reader = open_result_file(&worker_input, &open_options)?;
            let variable = reader.name().to_string();
            let rows = export_csv(&mut *reader, &worker_output, &options)?;
            reader.close()?;
            Ok((variable, rows))
        })
        .await
        .map_err(|e| GrafError::ConversionFailed {
            path: input.clone(),
            reason: format!("worker panicked: {}", e),
        })??;

    println!(
        "{} {} rows of {} to {} in {:.2}s",
        "Exported".bright_green().bold(),
        rows.to_string().bright_white(),
        variable.bright_white(),
        output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Print the header metadata of one result file.
async fn run_info(args: &InfoArgs) -> Result<()> {
    let open_options = args.open_options();
    let input = args.input.clone();
    let path_for_error = input.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut reader = open_result_file(&input, &open_options)?;
        reader.close()
    })
    .await
    .map_err(|e| GrafError::ConversionFailed {
        path: path_for_error,
        reason: format!("worker panicked: {}", e),
    })??;

    Ok(())
}

/// Set up structured logging based on CLI arguments.
fn setup_logging(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("graf_processor={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Scan a case directory for header files and return their stems.
fn discover_variables(case_path: &Path) -> Result<Vec<String>> {
    let pattern = case_path
        .join(format!("*.{}", HEADER_EXTENSION))
        .to_string_lossy()
        .into_owned();

    let mut variables = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| {
        GrafError::configuration(format!("Invalid scan pattern '{}': {}", pattern, e))
    })? {
        let path = entry.map_err(|e| GrafError::Io(e.into_error()))?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            variables.push(stem.to_string());
        }
    }
    variables.sort();

    debug!(
        "Discovered {} result files in {}",
        variables.len(),
        case_path.display()
    );
    Ok(variables)
}

/// Output file stem for a variable name, dropping any extension it carries.
fn output_stem(variable: &str) -> &str {
    Path::new(variable)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(variable)
}

/// Render the final batch report.
fn report_convert(args: &ConvertArgs, summary: &BatchSummary) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print_human_summary(summary);
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
            Ok(())
        }
    }
}

/// Human-readable batch summary block.
fn print_human_summary(summary: &BatchSummary) {
    let elapsed = Duration::from_millis(summary.elapsed_ms as u64);

    println!("\n{}", "Conversion Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Converted:".bright_cyan(),
        summary.converted.len().to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows written:".bright_cyan(),
        summary.total_rows().to_string().bright_white().bold()
    );
    if !summary.skipped.is_empty() {
        println!(
            "  {} {}",
            "Skipped (existing):".bright_cyan(),
            summary.skipped.len().to_string().bright_white()
        );
    }
    if !summary.failed.is_empty() {
        println!(
            "  {} {}",
            "Failed:".bright_red(),
            summary.failed.len().to_string().bright_red().bold()
        );
        for failure in &summary.failed {
            println!("    {}: {}", failure.variable.bright_red(), failure.error);
        }
    }
    println!(
        "  {} {}",
        "Time elapsed:".bright_cyan(),
        HumanDuration(elapsed).to_string().bright_white()
    );
}
