//! Storage traits and error types
//!
//! This module defines the interface the harvester needs from a storage
//! backend, and how records map onto table rows.

use crate::records::{Course, Program};
use crate::state::HarvestSnapshot;
use crate::storage::{LoadSummary, NewRun, RunRecord};
use crate::LoadResult;
use rusqlite::types::Value;
use thiserror::Error;

/// Errors raised by read-side storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A record that can be inserted as one table row
pub trait TableRow {
    /// Column names, in the order `values` returns them
    const COLUMNS: &'static [&'static str];

    /// Business key, reported when the insert conflicts
    fn key(&self) -> &str;

    /// Column values for the insert statement
    fn values(&self) -> Vec<Value>;
}

impl TableRow for Course {
    const COLUMNS: &'static [&'static str] =
        &["code", "name", "faculty", "description", "prerequisites"];

    fn key(&self) -> &str {
        self.code.as_str()
    }

    fn values(&self) -> Vec<Value> {
        let prerequisites = if self.prerequisites.is_empty() {
            Value::Null
        } else {
            Value::Text(
                self.prerequisites
                    .iter()
                    .map(|code| code.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            )
        };

        vec![
            Value::Text(self.code.to_string()),
            Value::Text(self.name.clone()),
            optional_text(&self.faculty),
            optional_text(&self.description),
            prerequisites,
        ]
    }
}

impl TableRow for Program {
    const COLUMNS: &'static [&'static str] = &["code", "name", "kind", "faculty"];

    fn key(&self) -> &str {
        &self.code
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.code.clone()),
            Value::Text(self.name.clone()),
            Value::Text(self.kind.to_db_string().to_string()),
            optional_text(&self.faculty),
        ]
    }
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Loading =====

    /// Inserts every course in one transaction
    ///
    /// Returns the number of rows inserted. On any failure nothing is
    /// committed.
    fn load_courses(&mut self, courses: &[Course]) -> LoadResult<usize>;

    /// Inserts every program in one transaction
    fn load_programs(&mut self, programs: &[Program]) -> LoadResult<usize>;

    /// Inserts courses, programs and the run ledger row in one transaction
    fn load_harvest(
        &mut self,
        snapshot: &HarvestSnapshot,
        run: &NewRun,
    ) -> LoadResult<LoadSummary>;

    // ===== Statistics =====

    /// Counts rows in the course table
    fn count_courses(&self) -> StorageResult<u64>;

    /// Counts rows in the program table
    fn count_programs(&self) -> StorageResult<u64>;

    /// Gets the most recent run ledger entry
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;
}
