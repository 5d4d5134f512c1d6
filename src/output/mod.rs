//! Output module for reporting harvest results
//!
//! This module handles:
//! - Printing the report of a finished harvest
//! - Reading statistics back out of the database

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::{HarvestReport, RunSummary, SequenceOutcome};

/// Prints the report of a harvest-and-load run
pub fn print_run_summary(summary: &RunSummary) {
    print_report(&summary.report);
    println!("Loaded:");
    println!("  Run: #{}", summary.load.run_id);
    println!("  Course rows: {}", summary.load.courses);
    println!("  Program rows: {}", summary.load.programs);
}

/// Prints a harvest report to stdout
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Report ===\n");

    let elapsed = report.finished_at - report.started_at;
    println!("Duration: {}s\n", elapsed.num_seconds());

    println!("Sequences:");
    print_sequence("Courses", &report.courses);
    print_sequence("Subject area index", &report.subject_index);
    println!(
        "  Program listings: {} of {} subject areas done",
        report.program_sequences_done,
        report.subject_areas.len()
    );
    println!();

    println!("Records:");
    println!("  Courses: {}", report.course_count);
    println!("  Programs: {}", report.program_count);
    println!();

    if !report.failed_subject_areas.is_empty() {
        println!(
            "Failed Subject Areas ({}):",
            report.failed_subject_areas.len()
        );
        for failure in &report.failed_subject_areas {
            println!("  - {} ({}): {}", failure.name, failure.url, failure.error);
        }
        println!();
    }
}

fn print_sequence(label: &str, outcome: &SequenceOutcome) {
    match &outcome.error {
        None => println!(
            "  {}: {} ({} pages, {} records)",
            label, outcome.state, outcome.pages_fetched, outcome.records
        ),
        Some(error) => println!(
            "  {}: {} after {} pages: {}",
            label, outcome.state, outcome.pages_fetched, error
        ),
    }
}
