//! Sweep command implementation

use crate::config::Config;
use crate::janitor::{sweep, SweepStats};
use std::time::Duration;

/// Remove stale ingestion artifacts under the configured temp directory
pub fn cmd_sweep(config: &Config, max_age_secs: Option<u64>) -> SweepStats {
    let max_age = max_age_secs.unwrap_or(config.ingest.janitor_max_age_secs);
    sweep(&config.ingest.temp_dir, Duration::from_secs(max_age))
}

pub fn print_sweep_stats(stats: &SweepStats) {
    println!("\n🧹 Sweep Complete\n");
    println!("Files removed: {}", stats.files_removed);
    println!("Directories removed: {}", stats.dirs_removed);
    if stats.errors > 0 {
        println!("Errors: {} (see log)", stats.errors);
    }
}
