//! Candidate discovery
//!
//! Turns a request into catalog filters and joins each surviving instance
//! type with its interruption rank in the requested region. An empty result
//! is a normal outcome; the caller reports it as "no suitable instance type".

use crate::advisor::{InterruptionRateCache, RegionInterruptionRank, RegionRanks};
use crate::catalog::{Architecture, Catalog, CatalogFilter, InstanceType, StorageKind};
use crate::request::OptimizationRequest;
use tracing::debug;

/// An eligible instance type and its rank (if the advisor knows it)
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'a> {
    pub instance: &'a InstanceType,
    pub rank: Option<RegionInterruptionRank>,
}

impl Candidate<'_> {
    /// Ordinal used for sorting; an unknown rank sorts last but stays eligible
    pub fn rank_key(&self) -> u32 {
        self.rank.as_ref().map(|r| r.rank).unwrap_or(u32::MAX)
    }
}

/// Hard filters implied by a request
pub fn filter_for(request: &OptimizationRequest) -> CatalogFilter {
    CatalogFilter {
        storage: request.ssd_only().then_some(StorageKind::Ssd),
        architecture: (!request.arm_instances()).then_some(Architecture::X86_64),
        families: request.instance_family().to_vec(),
        region: Some(request.region().to_string()),
        emr_version: request.emr_version().cloned(),
    }
}

/// Filter the catalog and attach ranks from an already-resolved table
pub fn annotate<'a>(
    catalog: &'a Catalog,
    request: &OptimizationRequest,
    ranks: &RegionRanks,
) -> Vec<Candidate<'a>> {
    catalog
        .query(&filter_for(request))
        .into_iter()
        .map(|instance| Candidate {
            instance,
            rank: ranks.lookup(&instance.name),
        })
        .collect()
}

/// Query engine over a catalog and an interruption-rate cache
pub struct QueryEngine<'a> {
    catalog: &'a Catalog,
    rates: &'a InterruptionRateCache,
}

impl<'a> QueryEngine<'a> {
    pub fn new(catalog: &'a Catalog, rates: &'a InterruptionRateCache) -> Self {
        Self { catalog, rates }
    }

    pub async fn find_candidates(&self, request: &OptimizationRequest) -> Vec<Candidate<'a>> {
        let filter = filter_for(request);
        let eligible = self.catalog.query(&filter);
        if eligible.is_empty() {
            debug!("No catalog entries pass the filters for {:?}", filter);
            return Vec::new();
        }

        let ranks = self.rates.get_or_refresh(request.region()).await;
        debug!(
            "{} eligible instance types, {} ranked in {}",
            eligible.len(),
            ranks.len(),
            request.region()
        );

        eligible
            .into_iter()
            .map(|instance| Candidate {
                instance,
                rank: ranks.lookup(&instance.name),
            })
            .collect()
    }
}
