//! Time-bounded, single-flight cache of interruption ranks
//!
//! `get_or_refresh` never fails. A fresh entry is returned as-is; otherwise
//! one fetch per region runs at a time and every concurrent caller for that
//! region awaits the same fetch. A failed fetch falls back to the stale entry
//! if there is one, or to a neutral table if there is not.

use super::{RankStore, RateSource, RegionRanks};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Entries older than this are refreshed before use
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on one refresh, retries included
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

type SharedFetch = Shared<BoxFuture<'static, Arc<RegionRanks>>>;
type InFlight = Arc<Mutex<HashMap<String, SharedFetch>>>;

/// Region-keyed interruption-rate cache shared by concurrent requests
pub struct InterruptionRateCache {
    store: Arc<dyn RankStore>,
    source: Arc<dyn RateSource>,
    ttl: Duration,
    fetch_timeout: Duration,
    in_flight: InFlight,
}

impl InterruptionRateCache {
    pub fn new(store: Arc<dyn RankStore>, source: Arc<dyn RateSource>) -> Self {
        Self {
            store,
            source,
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Ranks for `region`, refreshing them first if missing or expired
    pub async fn get_or_refresh(&self, region: &str) -> Arc<RegionRanks> {
        let cached = self.lookup(region);
        if let Some((ranks, age)) = &cached {
            if *age < self.ttl {
                debug!("Interruption rank cache hit for {} (age {:?})", region, age);
                return Arc::new(ranks.clone());
            }
        }

        let fetch = {
            let mut in_flight = lock(&self.in_flight);
            if let Some(existing) = in_flight.get(region) {
                debug!("Joining in-flight refresh for {}", region);
                existing.clone()
            } else {
                // A refresh may have finished between the lookup above and taking the lock
                if let Some((ranks, age)) = self.lookup(region) {
                    if age < self.ttl {
                        return Arc::new(ranks);
                    }
                }
                let stale = cached.map(|(ranks, _)| ranks);
                let fetch = refresh(
                    region.to_string(),
                    stale,
                    Arc::clone(&self.store),
                    Arc::clone(&self.source),
                    Arc::clone(&self.in_flight),
                    self.fetch_timeout,
                )
                .boxed()
                .shared();
                in_flight.insert(region.to_string(), fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Age of the stored entry for `region`, if any
    pub fn entry_age(&self, region: &str) -> Option<Duration> {
        self.lookup(region).map(|(_, age)| age)
    }

    /// Remove every stored entry
    pub fn clear(&self) -> crate::error::Result<()> {
        self.store.clear()
    }

    fn lookup(&self, region: &str) -> Option<(RegionRanks, Duration)> {
        match self.store.get(region) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Ignoring unreadable cache entry for {}: {}", region, e);
                None
            }
        }
    }
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<String, SharedFetch>> {
    in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn refresh(
    region: String,
    stale: Option<RegionRanks>,
    store: Arc<dyn RankStore>,
    source: Arc<dyn RateSource>,
    in_flight: InFlight,
    fetch_timeout: Duration,
) -> Arc<RegionRanks> {
    info!("Refreshing interruption ranks for {} from {}", region, source.origin());

    let fetched = match tokio::time::timeout(fetch_timeout, source.fetch(&region)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(_) => Err(format!("timed out after {:?}", fetch_timeout)),
    };

    let ranks = match fetched {
        Ok(ranks) => {
            if let Err(e) = store.set(&region, &ranks) {
                warn!("Failed to persist interruption ranks for {}: {}", region, e);
            }
            ranks
        }
        Err(reason) => match stale {
            Some(stale) => {
                warn!(
                    "Interruption rate refresh for {} failed ({}); using stale data from {}",
                    region,
                    reason,
                    stale.fetched_at()
                );
                stale
            }
            None => {
                warn!(
                    "Interruption rate refresh for {} failed ({}); ranking all instance types equally",
                    region, reason
                );
                RegionRanks::neutral(region.as_str())
            }
        },
    };

    // Only after the store is updated, so late callers see the fresh entry
    lock(&in_flight).remove(&region);
    Arc::new(ranks)
}
