//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - The all-or-nothing transactional load of a harvest snapshot
//! - The run ledger and row counts used for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult, TableRow};

use crate::config::DatabaseConfig;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Opens the configured database
///
/// An unreachable or unwritable database is fatal at startup.
pub fn open_storage(config: &DatabaseConfig) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::open(config).map_err(|e| {
        HarvestError::FatalInit(format!("Couldn't open database {}: {}", config.path, e))
    })
}

/// Connection pool limits, fixed once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolLimits {
    pub max_lifetime: Duration,
    pub max_open: u32,
    pub max_idle: u32,
}

impl PoolLimits {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_lifetime: Duration::from_secs(config.max_lifetime_secs),
            max_open: config.max_open,
            max_idle: config.max_idle,
        }
    }
}

/// A run ledger entry about to be written
#[derive(Debug, Clone)]
pub struct NewRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config_hash: String,
    pub failed_subject_areas: usize,
}

/// Represents a stored run ledger entry
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: String,
    pub config_hash: String,
    pub course_count: u64,
    pub program_count: u64,
    pub failed_subject_areas: u64,
}

/// Rows written by a successful load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub courses: usize,
    pub programs: usize,
    pub run_id: i64,
}

impl LoadSummary {
    pub fn rows_affected(&self) -> usize {
        self.courses + self.programs
    }
}
