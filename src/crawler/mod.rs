//! Crawler module for harvesting calendar listings
//!
//! This module contains the crawl-extract pipeline:
//! - Per-domain throttling and proxy rotation
//! - Rate-limited page fetching
//! - Pattern-based record extraction
//! - Pagination sequences and the coordinator that runs them

mod coordinator;
mod driver;
mod extractor;
mod fetcher;
mod proxy;
mod throttle;

pub use coordinator::{run_harvest, HarvestReport, Harvester, RunSummary, SubjectAreaFailure};
pub use driver::{run_sequence, SequenceOutcome};
pub use extractor::{
    extract, has_program_keyword, parse_course_header, parse_program_header, split_header,
    ContentType, Extracted, ExtractedPage, HEADER_DELIMITER, PROGRAM_KEYWORDS,
    SUBJECT_AREA_MARKER,
};
pub use fetcher::{build_http_client, FetchOutcome, Fetcher, Page};
pub use proxy::{ProxyRotator, Route};
pub use throttle::{DomainPermit, Throttle};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete harvest and load
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
pub async fn harvest(config: &Config, config_hash: &str) -> Result<RunSummary, HarvestError> {
    run_harvest(config, config_hash).await
}
