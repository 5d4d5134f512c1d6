//! Database schema definitions
//!
//! Record tables are named by configuration, so their DDL is rendered at
//! startup. Both use the calendar code as primary key: inserting a code
//! that is already present is a constraint violation, never an upsert.

/// Run ledger, one row per successful load
pub const RUNS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS harvest_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    course_count INTEGER NOT NULL,
    program_count INTEGER NOT NULL,
    failed_subject_areas INTEGER NOT NULL DEFAULT 0
);
"#;

/// DDL for the course table
pub fn course_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            code TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            faculty TEXT,
            description TEXT,
            prerequisites TEXT
        );"
    )
}

/// DDL for the program table
pub fn program_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            code TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            faculty TEXT
        );"
    )
}

/// Initializes the database schema
///
/// Table names must already be validated as plain SQL identifiers.
pub fn initialize_schema(
    conn: &rusqlite::Connection,
    course_table: &str,
    program_table: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&course_table_sql(course_table))?;
    conn.execute_batch(&program_table_sql(program_table))?;
    conn.execute_batch(RUNS_SQL)?;
    Ok(())
}
