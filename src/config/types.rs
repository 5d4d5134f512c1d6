use serde::Deserialize;

/// Main configuration structure for a harvest run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub database: DatabaseConfig,
}

/// The calendar site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// The only host requests may be sent to
    #[serde(rename = "allowed-domain")]
    pub allowed_domain: String,

    /// First page of the course search listing
    #[serde(rename = "course-seed")]
    pub course_seed: String,

    /// Index page listing every program subject area
    #[serde(rename = "subject-area-seed")]
    pub subject_area_seed: String,
}

/// Request pacing and transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Fixed delay between two requests to the same domain (milliseconds)
    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the random delay added to the base delay (milliseconds)
    #[serde(rename = "jitter-ms", default)]
    pub jitter_ms: u64,

    /// Total request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Upstream proxies used round-robin; empty means direct connections
    #[serde(default)]
    pub proxies: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            jitter_ms: 0,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            proxies: Vec::new(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,

    #[serde(rename = "course-table", default = "default_course_table")]
    pub course_table: String,

    #[serde(rename = "program-table", default = "default_program_table")]
    pub program_table: String,

    /// Maximum lifetime of a pooled connection (seconds)
    #[serde(rename = "max-lifetime-secs", default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,

    #[serde(rename = "max-open", default = "default_max_connections")]
    pub max_open: u32,

    #[serde(rename = "max-idle", default = "default_max_connections")]
    pub max_idle: u32,
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("calendar-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_course_table() -> String {
    "courses".to_string()
}

fn default_program_table() -> String {
    "programs".to_string()
}

fn default_max_lifetime_secs() -> u64 {
    180
}

fn default_max_connections() -> u32 {
    10
}
