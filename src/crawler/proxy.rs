//! Round-robin rotation over upstream proxies
//!
//! Each configured proxy gets its own HTTP client; requests take the next
//! client in order. With no proxies configured a single direct client is
//! used.
//!
//! Before a run, `verified` checks that every proxy accepts connections and
//! drops the ones that do not. A rotation left with no route is fatal.

use crate::config::FetcherConfig;
use crate::crawler::fetcher::build_http_client;
use crate::HarvestError;
use reqwest::{Client, Proxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

/// How long a proxy gets to accept the startup connection
const REACHABILITY_TIMEOUT: Duration = Duration::from_secs(10);

/// A client paired with the proxy it routes through
#[derive(Debug, Clone)]
pub struct Route {
    /// Proxy address, or None for direct connections
    pub proxy: Option<String>,
    pub client: Client,
}

/// Shared round-robin proxy rotator
#[derive(Debug)]
pub struct ProxyRotator {
    routes: Vec<Route>,
    next: AtomicUsize,
}

impl ProxyRotator {
    /// Builds a rotator with one direct route
    pub fn direct(client: Client) -> Self {
        Self {
            routes: vec![Route {
                proxy: None,
                client,
            }],
            next: AtomicUsize::new(0),
        }
    }

    /// Builds one client per configured proxy
    ///
    /// A proxy that cannot be turned into a working client is a fatal
    /// startup condition, not something to retry per request.
    pub fn from_config(config: &FetcherConfig) -> Result<Self, HarvestError> {
        if config.proxies.is_empty() {
            let client = build_http_client(config, None).map_err(|e| {
                HarvestError::FatalInit(format!("Failed to build HTTP client: {}", e))
            })?;
            return Ok(Self::direct(client));
        }

        let mut routes = Vec::with_capacity(config.proxies.len());
        for address in &config.proxies {
            let proxy = Proxy::all(address.as_str()).map_err(|e| {
                HarvestError::FatalInit(format!("Invalid proxy '{}': {}", address, e))
            })?;
            let client = build_http_client(config, Some(proxy)).map_err(|e| {
                HarvestError::FatalInit(format!(
                    "Failed to build client for proxy '{}': {}",
                    address, e
                ))
            })?;
            routes.push(Route {
                proxy: Some(address.clone()),
                client,
            });
        }

        tracing::info!("Rotating requests over {} proxies", routes.len());

        Ok(Self {
            routes,
            next: AtomicUsize::new(0),
        })
    }

    /// Keeps only the routes whose proxy accepts a TCP connection
    ///
    /// Direct routes are kept as they are.
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyRotator)` - At least one route is usable
    /// * `Err(HarvestError::FatalInit)` - Every proxy is unreachable
    pub async fn verified(self) -> Result<Self, HarvestError> {
        if self.is_direct() {
            return Ok(self);
        }

        let configured = self.routes.len();
        let mut live = Vec::with_capacity(configured);
        let mut failures = Vec::new();

        for route in self.routes {
            let address = match route.proxy.clone() {
                Some(address) => address,
                None => {
                    live.push(route);
                    continue;
                }
            };

            match check_reachable(&address).await {
                Ok(()) => live.push(route),
                Err(reason) => {
                    tracing::warn!("Dropping unreachable proxy {}: {}", address, reason);
                    failures.push(format!("{} ({})", address, reason));
                }
            }
        }

        if live.is_empty() {
            return Err(HarvestError::FatalInit(format!(
                "No reachable proxy: {}",
                failures.join(", ")
            )));
        }

        if live.len() < configured {
            tracing::info!("Using {} of {} proxies", live.len(), configured);
        }

        Ok(Self {
            routes: live,
            next: AtomicUsize::new(0),
        })
    }

    /// Returns the next route in round-robin order
    pub fn next_route(&self) -> &Route {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.routes.len();
        &self.routes[index]
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns true when requests go out without a proxy
    pub fn is_direct(&self) -> bool {
        self.routes.iter().all(|r| r.proxy.is_none())
    }
}

/// Opens and closes a TCP connection to the proxy's host and port
async fn check_reachable(address: &str) -> Result<(), String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    let host = url
        .host_str()
        .ok_or_else(|| "missing host".to_string())?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| "missing port".to_string())?;

    match tokio::time::timeout(REACHABILITY_TIMEOUT, TcpStream::connect((host.as_str(), port))).await
    {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no answer within {:?}", REACHABILITY_TIMEOUT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// A local port with nothing listening on it
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    fn config_with_proxies(proxies: &[&str]) -> FetcherConfig {
        FetcherConfig {
            proxies: proxies.iter().map(|p| p.to_string()).collect(),
            ..FetcherConfig::default()
        }
    }

    #[test]
    fn test_no_proxies_means_direct() {
        let rotator = ProxyRotator::from_config(&config_with_proxies(&[])).unwrap();
        assert_eq!(rotator.len(), 1);
        assert!(rotator.is_direct());
        assert!(rotator.next_route().proxy.is_none());
    }

    #[test]
    fn test_round_robin_order() {
        let rotator = ProxyRotator::from_config(&config_with_proxies(&[
            "http://127.0.0.1:8080",
            "http://127.0.0.1:8081",
            "http://127.0.0.1:8082",
        ]))
        .unwrap();

        let order: Vec<String> = (0..6)
            .map(|_| rotator.next_route().proxy.clone().unwrap())
            .collect();

        assert_eq!(
            order,
            vec![
                "http://127.0.0.1:8080",
                "http://127.0.0.1:8081",
                "http://127.0.0.1:8082",
                "http://127.0.0.1:8080",
                "http://127.0.0.1:8081",
                "http://127.0.0.1:8082",
            ]
        );
        assert!(!rotator.is_direct());
    }

    #[test]
    fn test_invalid_proxy_is_fatal() {
        let result = ProxyRotator::from_config(&config_with_proxies(&["ftp://proxy.example.com:21"]));
        assert!(matches!(result, Err(HarvestError::FatalInit(_))));
    }

    #[tokio::test]
    async fn test_direct_rotation_needs_no_check() {
        let rotator = ProxyRotator::from_config(&config_with_proxies(&[]))
            .unwrap()
            .verified()
            .await
            .unwrap();
        assert!(rotator.is_direct());
    }

    #[tokio::test]
    async fn test_unreachable_proxies_are_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live = format!("http://{}", listener.local_addr().unwrap());
        let dead = format!("http://127.0.0.1:{}", closed_port().await);

        let rotator = ProxyRotator::from_config(&config_with_proxies(&[dead.as_str(), live.as_str()]))
            .unwrap()
            .verified()
            .await
            .unwrap();

        assert_eq!(rotator.len(), 1);
        assert_eq!(rotator.next_route().proxy.as_deref(), Some(live.as_str()));
        assert_eq!(rotator.next_route().proxy.as_deref(), Some(live.as_str()));
    }

    #[tokio::test]
    async fn test_no_reachable_proxy_is_fatal() {
        let dead = format!("http://127.0.0.1:{}", closed_port().await);

        let result = ProxyRotator::from_config(&config_with_proxies(&[dead.as_str()]))
            .unwrap()
            .verified()
            .await;

        assert!(matches!(result, Err(HarvestError::FatalInit(_))));
    }
}
