//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! row counts and the latest run ledger entry.

use crate::storage::{RunRecord, Storage, StorageResult};

/// Database statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Rows in the course table
    pub course_rows: u64,

    /// Rows in the program table
    pub program_rows: u64,

    /// The most recent committed run, if any
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        course_rows: storage.count_courses()?,
        program_rows: storage.count_programs()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Stored Records:");
    println!("  Courses: {}", stats.course_rows);
    println!("  Programs: {}", stats.program_rows);
    println!();

    match &stats.latest_run {
        Some(run) => {
            println!("Latest Run (#{}):", run.id);
            println!("  Started: {}", run.started_at);
            println!("  Finished: {}", run.finished_at);
            println!("  Config hash: {}", run.config_hash);
            println!("  Courses loaded: {}", run.course_count);
            println!("  Programs loaded: {}", run.program_count);
            if run.failed_subject_areas > 0 {
                println!("  Failed subject areas: {}", run.failed_subject_areas);
            }
        }
        None => println!("No completed runs recorded."),
    }
}
