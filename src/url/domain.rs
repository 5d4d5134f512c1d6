use url::Url;

/// Extracts the lowercase host of a URL
///
/// Returns None for URLs without a host (e.g. `data:` URLs).
///
/// # Examples
///
/// ```
/// use url::Url;
/// use calendar_harvest::url::extract_domain;
///
/// let url = Url::parse("https://ArtSci.Calendar.UToronto.ca/search-courses").unwrap();
/// assert_eq!(extract_domain(&url), Some("artsci.calendar.utoronto.ca".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether a URL belongs to the single allowed domain
///
/// Only an exact host match counts; subdomains of the allowed domain are
/// out of scope.
pub fn is_in_scope(url: &Url, allowed_domain: &str) -> bool {
    extract_domain(url).is_some_and(|host| host == allowed_domain.to_lowercase())
}
