//! Calendar Harvest: a polite course-calendar harvester
//!
//! This crate crawls the paginated listings of a public course calendar,
//! extracts course and program records from the page markup, deduplicates
//! them in memory and loads the result into SQLite in a single transaction.

pub mod config;
pub mod crawler;
pub mod output;
pub mod records;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Fatal startup error: {0}")]
    FatalInit(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while retrieving a single page
///
/// A fetch error aborts the pagination sequence that issued the request.
/// Requests are never retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to read body of {url}: {source}")]
    Body { url: String, source: reqwest::Error },
}

impl FetchError {
    /// Returns the URL whose retrieval failed
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. } | Self::Status { url, .. } | Self::Body { url, .. } => url,
        }
    }
}

/// Errors raised by the transactional loader
///
/// Any of these means the whole batch was rolled back.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Duplicate key '{key}' in table {table}")]
    Conflict { table: String, key: String },

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for page retrieval
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for loader operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

// Re-export commonly used types
pub use config::Config;
pub use records::{Course, CourseCode, Program, ProgramSubjectArea};
pub use state::{RecordStore, SequenceState};
pub use url::{extract_domain, is_in_scope};
