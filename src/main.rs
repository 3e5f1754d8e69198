use clap::Parser;
use graf_processor::cli::{args::Args, commands};
use graf_processor::GrafError;
use std::process;

fn main() {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result,
            _ = shutdown_signal() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(GrafError::Interrupted {
                    reason: "interrupted by user".to_string(),
                })
            }
        }
    });

    match result {
        Ok(()) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {}", error);
            process::exit(1);
        }
    }
}

/// Resolves when CTRL+C is received. If the handler cannot be installed
/// the future never resolves and the command simply runs to completion.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}
