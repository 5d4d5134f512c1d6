//! Per-domain request throttle
//!
//! One `Throttle` is shared by every task issuing requests during a run.
//! It enforces:
//! - at most one in-flight request per domain
//! - an idle gap of base delay plus uniform random jitter between the end
//!   of one request to a domain and the start of the next, no matter which
//!   task sent them

use crate::config::FetcherConfig;
use crate::state::DomainState;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Exclusive right to send one request to a domain
///
/// The domain stays locked until the permit is dropped, so callers must
/// hold it until the response body has been read. Dropping the permit marks
/// the request finished and starts the idle gap.
pub struct DomainPermit {
    domain: String,
    state: OwnedMutexGuard<DomainState>,
}

impl DomainPermit {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Number of requests dispatched to this domain, this one included
    pub fn request_count(&self) -> u32 {
        self.state.request_count
    }
}

impl Drop for DomainPermit {
    fn drop(&mut self) {
        self.state.record_finish(Instant::now());
    }
}

/// Shared rate limiter keyed by domain
pub struct Throttle {
    base_delay: Duration,
    jitter: Duration,
    domains: Mutex<HashMap<String, Arc<Mutex<DomainState>>>>,
}

impl Throttle {
    pub fn new(base_delay: Duration, jitter: Duration) -> Self {
        Self {
            base_delay,
            jitter,
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &FetcherConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.jitter_ms),
        )
    }

    /// Waits until a request to `domain` may be sent and claims it
    ///
    /// Callers queue on the domain's lock, then sleep off whatever remains
    /// of the gap owed since the previous request finished.
    pub async fn acquire(&self, domain: &str) -> DomainPermit {
        let slot = {
            let mut domains = self.domains.lock().await;
            Arc::clone(
                domains
                    .entry(domain.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(DomainState::new()))),
            )
        };

        let mut state = slot.lock_owned().await;

        if let Some(wait) = state.time_until_next_request(Instant::now()) {
            tracing::trace!("Throttling {} for {:?}", domain, wait);
            tokio::time::sleep(wait).await;
        }

        state.record_dispatch(self.next_delay());

        DomainPermit {
            domain: domain.to_string(),
            state,
        }
    }

    /// Base delay plus a fresh jitter sample
    fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.base_delay;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.base_delay + Duration::from_millis(jitter_ms)
    }

    /// Total requests recorded for a domain so far
    pub async fn request_count(&self, domain: &str) -> u32 {
        let slot = self.domains.lock().await.get(domain).cloned();
        match slot {
            Some(slot) => slot.lock().await.request_count,
            None => 0,
        }
    }
}
