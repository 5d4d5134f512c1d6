//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.
//! Every load runs inside a single transaction; the transaction is rolled
//! back when it is dropped without a commit, so any early return through
//! `?` leaves the tables untouched.

use crate::config::{is_sql_identifier, DatabaseConfig};
use crate::records::{Course, Program};
use crate::state::HarvestSnapshot;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult, TableRow};
use crate::storage::{LoadSummary, NewRun, PoolLimits, RunRecord};
use crate::{LoadError, LoadResult};
use rusqlite::{ffi, params, params_from_iter, Connection, ErrorCode, OptionalExtension, Transaction};
use std::path::Path;

/// SQLite storage backend
///
/// SQLite serializes writers itself, so the backend keeps one connection
/// and carries the configured pool limits for reporting.
pub struct SqliteStorage {
    conn: Connection,
    course_table: String,
    program_table: String,
    limits: PoolLimits,
}

impl SqliteStorage {
    /// Opens (or creates) the database file and its tables
    pub fn open(config: &DatabaseConfig) -> StorageResult<Self> {
        let conn = Connection::open(Path::new(&config.path))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        Self::with_connection(conn, config)
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory(config: &DatabaseConfig) -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, config)
    }

    /// Rejects table names that are not plain SQL identifiers before any
    /// DDL is built from them
    fn with_connection(conn: Connection, config: &DatabaseConfig) -> StorageResult<Self> {
        for table in [&config.course_table, &config.program_table] {
            if !is_sql_identifier(table) {
                return Err(StorageError::InvalidTable(table.clone()));
            }
        }

        initialize_schema(&conn, &config.course_table, &config.program_table)?;

        let limits = PoolLimits::from_config(config);
        tracing::debug!(
            "Database {} ready (max open {}, max idle {}, max lifetime {:?})",
            config.path,
            limits.max_open,
            limits.max_idle,
            limits.max_lifetime
        );

        Ok(Self {
            conn,
            course_table: config.course_table.clone(),
            program_table: config.program_table.clone(),
            limits,
        })
    }

    /// Configured pool limits
    ///
    /// Reported only: the backend always holds exactly one connection, and
    /// these values never size or expire it.
    pub fn pool_limits(&self) -> PoolLimits {
        self.limits
    }

    pub fn course_table(&self) -> &str {
        &self.course_table
    }

    pub fn program_table(&self) -> &str {
        &self.program_table
    }

    /// Inserts every record into `table` in one transaction
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Rows inserted; all of them were committed
    /// * `Err(LoadError)` - Nothing was committed
    pub fn load<R: TableRow>(&mut self, table: &str, records: &[R]) -> LoadResult<usize> {
        let tx = self.conn.transaction()?;
        let rows = insert_rows(&tx, table, records)?;
        tx.commit()?;

        tracing::info!("Loaded {} rows into {}", rows, table);
        Ok(rows)
    }

    fn count_rows(&self, table: &str) -> StorageResult<u64> {
        if !is_sql_identifier(table) {
            return Err(StorageError::UnknownTable(table.to_string()));
        }
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

/// Executes one insert per record inside an open transaction
fn insert_rows<R: TableRow>(tx: &Transaction<'_>, table: &str, records: &[R]) -> LoadResult<usize> {
    if !is_sql_identifier(table) {
        return Err(LoadError::InvalidTable(table.to_string()));
    }

    let placeholders = (1..=R::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        R::COLUMNS.join(", "),
        placeholders
    );

    let mut stmt = tx.prepare(&sql)?;
    let mut rows = 0;
    for record in records {
        rows += stmt
            .execute(params_from_iter(record.values()))
            .map_err(|e| classify_insert_error(e, table, record.key()))?;
    }
    Ok(rows)
}

/// Maps key collisions to `LoadError::Conflict`
fn classify_insert_error(error: rusqlite::Error, table: &str, key: &str) -> LoadError {
    if is_key_conflict(&error) {
        tracing::warn!("Key {} already present in {}, rolling back", key, table);
        LoadError::Conflict {
            table: table.to_string(),
            key: key.to_string(),
        }
    } else {
        tracing::warn!("Insert of {} into {} failed, rolling back: {}", key, table, error);
        LoadError::Sqlite(error)
    }
}

fn is_key_conflict(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

impl Storage for SqliteStorage {
    // ===== Loading =====

    fn load_courses(&mut self, courses: &[Course]) -> LoadResult<usize> {
        let table = self.course_table.clone();
        self.load(&table, courses)
    }

    fn load_programs(&mut self, programs: &[Program]) -> LoadResult<usize> {
        let table = self.program_table.clone();
        self.load(&table, programs)
    }

    fn load_harvest(
        &mut self,
        snapshot: &HarvestSnapshot,
        run: &NewRun,
    ) -> LoadResult<LoadSummary> {
        let tx = self.conn.transaction()?;

        let courses = insert_rows(&tx, &self.course_table, &snapshot.courses)?;
        let programs = insert_rows(&tx, &self.program_table, &snapshot.programs)?;

        tx.execute(
            "INSERT INTO harvest_runs
             (started_at, finished_at, config_hash, course_count, program_count, failed_subject_areas)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                run.started_at.to_rfc3339(),
                run.finished_at.to_rfc3339(),
                run.config_hash,
                courses as i64,
                programs as i64,
                run.failed_subject_areas as i64,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        tx.commit()?;

        tracing::info!(
            "Committed run {}: {} courses into {}, {} programs into {}",
            run_id,
            courses,
            self.course_table,
            programs,
            self.program_table
        );

        Ok(LoadSummary {
            courses,
            programs,
            run_id,
        })
    }

    // ===== Statistics =====

    fn count_courses(&self) -> StorageResult<u64> {
        self.count_rows(&self.course_table)
    }

    fn count_programs(&self) -> StorageResult<u64> {
        self.count_rows(&self.program_table)
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, course_count, program_count,
             failed_subject_areas FROM harvest_runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                    config_hash: row.get(3)?,
                    course_count: row.get::<_, i64>(4)? as u64,
                    program_count: row.get::<_, i64>(5)? as u64,
                    failed_subject_areas: row.get::<_, i64>(6)? as u64,
                })
            })
            .optional()?;

        Ok(run)
    }
}
