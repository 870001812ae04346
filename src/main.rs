//! hashwalk - Concurrent File-Tree Cataloger
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use hashwalk::config::{CliArgs, ScanConfig};
use hashwalk::progress::{print_header, print_summary, ProgressReporter};
use hashwalk::scanner::ScanCoordinator;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = ScanConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        let roots: Vec<String> = config
            .roots
            .iter()
            .map(|r| r.display().to_string())
            .collect();
        print_header(
            &roots,
            config.worker_count,
            &config.output_path.display().to_string(),
        );
    }

    let show_progress = config.show_progress;
    let output_path = config.output_path.display().to_string();

    let coordinator = ScanCoordinator::new(config).context("Failed to initialize scanner")?;

    // Graceful shutdown: workers notice the flag within one poll interval
    let shutdown_flag = coordinator.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let progress = if show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };

    let result = coordinator.run(progress.as_ref()).context("Scan failed")?;

    if let Some(ref p) = progress {
        if result.completed {
            p.finish("Catalog run completed");
        } else {
            p.finish("Catalog run interrupted");
        }
    }

    print_summary(
        result.dirs_scanned,
        result.dirs_resumed,
        result.files_hashed,
        result.bytes_hashed,
        result.failures,
        result.duration,
        &output_path,
    );

    if !result.completed {
        info!("Run was interrupted before reaching quiescence");
    }

    if result.failures > 0 {
        info!(
            failures = result.failures,
            "Run completed with failures, see the failures table"
        );
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("hashwalk=debug,warn")
    } else {
        EnvFilter::new("hashwalk=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
