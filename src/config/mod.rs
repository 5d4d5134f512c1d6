//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use calendar_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting {}", config.site.allowed_domain);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{Config, DatabaseConfig, FetcherConfig, SiteConfig};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::{is_sql_identifier, validate};
