//! Rate-limited page fetcher
//!
//! This module handles all HTTP requests for the harvester:
//! - Refusing URLs outside the allowed domain
//! - Waiting on the shared per-domain throttle
//! - Rotating through upstream proxies
//! - Classifying failures (no retries)

use crate::config::{Config, FetcherConfig};
use crate::crawler::proxy::ProxyRotator;
use crate::crawler::throttle::Throttle;
use crate::url::{extract_domain, is_in_scope};
use crate::{FetchError, FetchResult, HarvestError};
use reqwest::{Client, Proxy};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A retrieved page
#[derive(Debug, Clone)]
pub struct Page {
    /// The URL the page was requested from
    pub url: Url,

    /// Page body content
    pub body: String,
}

/// Result of a fetch that did not fail
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page was retrieved
    Fetched(Page),

    /// The URL is outside the allowed domain; no request was sent
    OutOfScope,
}

/// Builds an HTTP client with the configured user agent and timeouts
///
/// # Arguments
///
/// * `config` - The fetcher configuration
/// * `proxy` - Upstream proxy to route every request through, if any
pub fn build_http_client(
    config: &FetcherConfig,
    proxy: Option<Proxy>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    builder = match proxy {
        Some(proxy) => builder.proxy(proxy),
        None => builder.no_proxy(),
    };

    builder.build()
}

/// Fetcher shared by every pagination task
///
/// Cloning is cheap; clones share the same throttle and proxy rotation.
#[derive(Clone)]
pub struct Fetcher {
    allowed_domain: String,
    throttle: Arc<Throttle>,
    proxies: Arc<ProxyRotator>,
}

impl Fetcher {
    pub fn new(
        allowed_domain: impl Into<String>,
        throttle: Arc<Throttle>,
        proxies: Arc<ProxyRotator>,
    ) -> Self {
        Self {
            allowed_domain: allowed_domain.into().to_lowercase(),
            throttle,
            proxies,
        }
    }

    /// Builds the throttle and proxy rotation described by the configuration
    ///
    /// Fails with `HarvestError::FatalInit` when a proxy address is invalid.
    /// Proxies are not contacted; see `connect`.
    pub fn from_config(config: &Config) -> Result<Self, HarvestError> {
        let throttle = Arc::new(Throttle::from_config(&config.fetcher));
        let proxies = Arc::new(ProxyRotator::from_config(&config.fetcher)?);
        Ok(Self::new(&config.site.allowed_domain, throttle, proxies))
    }

    /// Like `from_config`, but also drops proxies that refuse connections
    ///
    /// Fails with `HarvestError::FatalInit` when no proxy is reachable.
    pub async fn connect(config: &Config) -> Result<Self, HarvestError> {
        let throttle = Arc::new(Throttle::from_config(&config.fetcher));
        let proxies = ProxyRotator::from_config(&config.fetcher)?.verified().await?;
        Ok(Self::new(
            &config.site.allowed_domain,
            throttle,
            Arc::new(proxies),
        ))
    }

    pub fn allowed_domain(&self) -> &str {
        &self.allowed_domain
    }

    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Fetches a single page
    ///
    /// # Request Flow
    ///
    /// 1. Refuse the URL if it is outside the allowed domain
    /// 2. Wait for the domain's throttle permit
    /// 3. Log the URL and send the GET through the next proxy route
    /// 4. Treat any non-2xx status as a failure
    ///
    /// # Returns
    ///
    /// * `Ok(FetchOutcome::Fetched)` - The page body
    /// * `Ok(FetchOutcome::OutOfScope)` - Nothing was requested
    /// * `Err(FetchError)` - The request failed; it is not retried
    pub async fn fetch(&self, url: &Url) -> FetchResult<FetchOutcome> {
        if !is_in_scope(url, &self.allowed_domain) {
            tracing::debug!("Refusing out-of-scope URL {}", url);
            return Ok(FetchOutcome::OutOfScope);
        }

        // is_in_scope guarantees a host
        let domain = extract_domain(url).unwrap_or_default();
        let _permit = self.throttle.acquire(&domain).await;

        let route = self.proxies.next_route();
        match &route.proxy {
            Some(proxy) => tracing::info!("Visiting {} via {}", url, proxy),
            None => tracing::info!("Visiting {}", url),
        }

        let response = route
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(FetchOutcome::Fetched(Page {
            url: url.clone(),
            body,
        }))
    }
}
