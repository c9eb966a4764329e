//! Shared helpers for integration tests
//!
//! Provides an in-process rate source that counts fetches, plus builders
//! for fixed rank tables and optimizers over the bundled catalog.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use spot_optimizer::advisor::{
    InterruptionRateCache, MemoryStore, RankEntry, RateSource, RegionRanks,
};
use spot_optimizer::error::{OptimizerError, Result};
use spot_optimizer::{Catalog, SpotOptimizer};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Rate source returning a fixed table and counting calls
pub struct CountingSource {
    ranks: Vec<(String, u32)>,
    delay: Duration,
    fail: bool,
    calls: AtomicU32,
}

impl CountingSource {
    pub fn new(ranks: &[(&str, u32)]) -> Self {
        Self {
            ranks: ranks.iter().map(|(n, r)| (n.to_string(), *r)).collect(),
            delay: Duration::ZERO,
            fail: false,
            calls: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(&[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for CountingSource {
    async fn fetch(&self, region: &str) -> Result<RegionRanks> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(OptimizerError::rate_fetch("counting-source", "unavailable"));
        }
        Ok(ranks(region, &self.ranks))
    }

    fn origin(&self) -> String {
        "counting-source".to_string()
    }
}

pub fn ranks<S: AsRef<str>>(region: &str, entries: &[(S, u32)]) -> RegionRanks {
    let entries: BTreeMap<String, RankEntry> = entries
        .iter()
        .map(|(name, rank)| {
            (
                name.as_ref().to_string(),
                RankEntry {
                    rank: *rank,
                    savings: None,
                },
            )
        })
        .collect();
    RegionRanks::new(region, Utc::now(), Vec::new(), entries)
}

/// Optimizer over the bundled catalog with an in-memory cache
pub fn optimizer(source: Arc<CountingSource>) -> SpotOptimizer {
    let catalog = Catalog::bundled().expect("bundled catalog loads");
    let rates = InterruptionRateCache::new(Arc::new(MemoryStore::new()), source);
    SpotOptimizer::new(Arc::new(catalog), Arc::new(rates))
}
