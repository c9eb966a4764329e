//! Spot interruption-rate data
//!
//! Interruption ranks come from the AWS Spot Instance Advisor feed and are
//! only meaningful within one region. `cache::InterruptionRateCache` keeps a
//! per-region table fresh; `client::SpotAdvisorClient` is the HTTP source.

pub mod cache;
pub mod client;
pub mod store;

pub use cache::InterruptionRateCache;
pub use client::SpotAdvisorClient;
pub use store::{FileStore, MemoryStore, RankStore};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Interruption bucket as published by the advisor (`<5%`, `5-10%`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptionRange {
    pub index: u32,
    pub label: String,
    #[serde(default)]
    pub max: Option<u32>,
}

/// Advisor scores for one instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Interruption bucket index, lower is more stable
    pub rank: u32,
    /// Savings over on-demand, percent
    #[serde(default)]
    pub savings: Option<u32>,
}

/// One instance type's rank within a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionInterruptionRank {
    pub region: String,
    pub instance_type: String,
    pub rank: u32,
    pub savings: Option<u32>,
    pub label: Option<String>,
    pub refreshed_at: DateTime<Utc>,
}

/// Interruption ranks for every instance type the advisor knows in one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRanks {
    region: String,
    fetched_at: DateTime<Utc>,
    #[serde(default)]
    ranges: Vec<InterruptionRange>,
    #[serde(default)]
    entries: BTreeMap<String, RankEntry>,
}

impl RegionRanks {
    pub fn new(
        region: impl Into<String>,
        fetched_at: DateTime<Utc>,
        ranges: Vec<InterruptionRange>,
        entries: BTreeMap<String, RankEntry>,
    ) -> Self {
        Self {
            region: region.into(),
            fetched_at,
            ranges,
            entries,
        }
    }

    /// Table that ranks every instance type equally (no data)
    pub fn neutral(region: impl Into<String>) -> Self {
        Self::new(region, Utc::now(), Vec::new(), BTreeMap::new())
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_neutral(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Age of the data, clamped at zero for clocks that moved backwards
    pub fn age(&self) -> std::time::Duration {
        Utc::now()
            .signed_duration_since(self.fetched_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn lookup(&self, instance_type: &str) -> Option<RegionInterruptionRank> {
        self.entries
            .get(instance_type)
            .map(|entry| RegionInterruptionRank {
                region: self.region.clone(),
                instance_type: instance_type.to_string(),
                rank: entry.rank,
                savings: entry.savings,
                label: self
                    .ranges
                    .iter()
                    .find(|r| r.index == entry.rank)
                    .map(|r| r.label.clone()),
                refreshed_at: self.fetched_at,
            })
    }
}

/// External source of interruption ranks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Fetch the current ranks for `region`
    async fn fetch(&self, region: &str) -> Result<RegionRanks>;

    /// Human-readable origin, used in logs
    fn origin(&self) -> String;
}
