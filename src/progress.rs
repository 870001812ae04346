//! Progress reporting for the catalog run
//!
//! Provides a real-time status line using an indicatif spinner, plus
//! the header and summary blocks printed around a run.

use crate::scanner::ScanProgress;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays scan status
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .expect("Invalid progress template")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &ScanProgress) {
        let msg = format!(
            "Dirs: {} | Files: {} | Hashed: {} | Rate: {:.0}/s | Queue: {} | Workers: {}/{}",
            format_number(progress.dirs),
            format_number(progress.files),
            format_size(progress.bytes, BINARY),
            progress.files_per_second(),
            progress.queue_len,
            progress.live_workers,
            progress.total_workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a header at the start of the run
pub fn print_header(roots: &[String], workers: usize, output: &str) {
    println!();
    println!(
        "{} {}",
        style("hashwalk").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Roots:").bold(), roots.join(", "));
    println!("  {} {}", style("Workers:").bold(), workers);
    println!("  {} {}", style("Catalog:").bold(), output);
    println!();
}

/// Print a summary of the run results
pub fn print_summary(
    dirs: u64,
    resumed: u64,
    files: u64,
    bytes: u64,
    failures: u64,
    duration: Duration,
    db_path: &str,
) {
    let duration_secs = duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        files as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Catalog Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Directories:").bold(), format_number(dirs));
    if resumed > 0 {
        println!(
            "  {} {}",
            style("Resumed (not rehashed):").bold(),
            format_number(resumed)
        );
    }
    println!("  {} {}", style("Files hashed:").bold(), format_number(files));
    println!(
        "  {} {}",
        style("Bytes hashed:").bold(),
        format_size(bytes, BINARY)
    );
    println!(
        "  {} {:.1}s ({:.0} files/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if failures > 0 {
        println!(
            "  {} {}",
            style("Failures:").yellow().bold(),
            format_number(failures)
        );
    }
    println!("  {} {}", style("Catalog:").bold(), db_path);
    println!();
}
