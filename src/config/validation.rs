use crate::config::types::{Config, DatabaseConfig, FetcherConfig, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Proxy schemes reqwest can route through
const PROXY_SCHEMES: [&str; 3] = ["http", "https", "socks5"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_database_config(&config.database)?;
    Ok(())
}

/// Validates the harvested site and its seed pages
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_domain_string(&config.allowed_domain)?;

    for (label, seed) in [
        ("course-seed", &config.course_seed),
        ("subject-area-seed", &config.subject_area_seed),
    ] {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", label, seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "{} '{}' must use HTTP or HTTPS",
                label, seed
            )));
        }

        let host = url.host_str().unwrap_or_default().to_lowercase();
        if host != config.allowed_domain.to_lowercase() {
            return Err(ConfigError::Validation(format!(
                "{} '{}' is outside the allowed domain '{}'",
                label, seed, config.allowed_domain
            )));
        }
    }

    Ok(())
}

/// Validates request pacing and the proxy list
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.base_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "base-delay-ms must be >= 100ms, got {}ms",
            config.base_delay_ms
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    for proxy in &config.proxies {
        validate_proxy(proxy)?;
    }

    Ok(())
}

/// Validates a single upstream proxy address (scheme://host:port)
fn validate_proxy(proxy: &str) -> Result<(), ConfigError> {
    let url = Url::parse(proxy)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;

    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(ConfigError::Validation(format!(
            "Proxy '{}' must use one of {:?}",
            proxy, PROXY_SCHEMES
        )));
    }

    if url.host_str().is_none() || url.port_or_known_default().is_none() {
        return Err(ConfigError::Validation(format!(
            "Proxy '{}' must name a host and port",
            proxy
        )));
    }

    Ok(())
}

/// Validates table names and connection pool limits
fn validate_database_config(config: &DatabaseConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "database path cannot be empty".to_string(),
        ));
    }

    for table in [&config.course_table, &config.program_table] {
        if !is_sql_identifier(table) {
            return Err(ConfigError::Validation(format!(
                "Table name '{}' must be a plain SQL identifier",
                table
            )));
        }
    }

    if config.course_table.eq_ignore_ascii_case(&config.program_table) {
        return Err(ConfigError::Validation(
            "course-table and program-table must differ".to_string(),
        ));
    }

    if config.max_open < 1 {
        return Err(ConfigError::Validation(format!(
            "max-open must be >= 1, got {}",
            config.max_open
        )));
    }

    if config.max_idle > config.max_open {
        return Err(ConfigError::Validation(format!(
            "max-idle ({}) cannot exceed max-open ({})",
            config.max_idle, config.max_open
        )));
    }

    Ok(())
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*`
///
/// Table names are interpolated into SQL, so nothing else is accepted.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validates a domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "allowed-domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
