//! URL handling module
//!
//! This module provides the domain scope guard used by the fetcher and
//! resolution of links found in page markup.

mod domain;

pub use domain::{extract_domain, is_in_scope};

use url::Url;

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should not be followed:
/// - empty or fragment-only hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - hrefs that do not resolve to an HTTP(S) URL
///
/// # Examples
///
/// ```
/// use calendar_harvest::url::resolve_link;
/// use url::Url;
///
/// let base = Url::parse("https://artsci.calendar.utoronto.ca/search-courses").unwrap();
/// let next = resolve_link("/search-courses?page=1", &base).unwrap();
/// assert_eq!(next.as_str(), "https://artsci.calendar.utoronto.ca/search-courses?page=1");
/// ```
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
