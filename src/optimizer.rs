//! Programmatic entry point
//!
//! `SpotOptimizer` owns the immutable catalog and the shared rate cache and
//! runs a request through query, selection and formatting. It is cheap to
//! clone and safe to call concurrently.

use crate::advisor::{
    FileStore, InterruptionRateCache, MemoryStore, RankStore, RateSource, SpotAdvisorClient,
};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::Result;
use crate::query::QueryEngine;
use crate::request::{OptimizationRequest, RequestBuilder};
use crate::result::{format_outcome, OptimizationOutcome};
use crate::selection;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct SpotOptimizer {
    catalog: Arc<Catalog>,
    rates: Arc<InterruptionRateCache>,
}

impl SpotOptimizer {
    pub fn new(catalog: Arc<Catalog>, rates: Arc<InterruptionRateCache>) -> Self {
        Self { catalog, rates }
    }

    /// Build from configuration
    ///
    /// Fails with `CatalogLoad` if the catalog cannot be read; nothing is
    /// served in that case.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = match &config.catalog.path {
            Some(path) => Catalog::from_path(path)?,
            None => Catalog::bundled()?,
        };
        info!(
            "Loaded {} instance types (catalog {})",
            catalog.len(),
            catalog.generated_at().unwrap_or("unversioned")
        );

        let source: Arc<dyn RateSource> = Arc::new(SpotAdvisorClient::new(
            config.advisor.url.clone(),
            config.advisor.timeout(),
            config.advisor.max_attempts,
        )?);
        let rates = InterruptionRateCache::new(rank_store(config), source)
            .with_ttl(config.advisor.ttl())
            .with_fetch_timeout(config.advisor.fetch_timeout());

        Ok(Self::new(Arc::new(catalog), Arc::new(rates)))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rates(&self) -> &InterruptionRateCache {
        &self.rates
    }

    /// Validate and optimize; invalid input comes back as an error result
    pub async fn optimize(&self, request: RequestBuilder) -> OptimizationOutcome {
        match request.build() {
            Ok(request) => self.optimize_request(&request).await,
            Err(e) => {
                debug!("Rejected request: {}", e);
                OptimizationOutcome::Error(e.into())
            }
        }
    }

    pub async fn optimize_request(&self, request: &OptimizationRequest) -> OptimizationOutcome {
        let engine = QueryEngine::new(&self.catalog, &self.rates);
        let candidates = engine.find_candidates(request).await;
        debug!("{} candidates for {:?}", candidates.len(), request);

        let winner = selection::select(candidates, request.cores(), request.memory(), request.mode());
        if let Some(winner) = &winner {
            debug!(
                "Selected {} x {} in {} mode",
                winner.count,
                winner.instance().name,
                request.mode()
            );
        }
        format_outcome(winner, request)
    }
}

/// Persistent store if a cache directory is available, in-memory otherwise
pub fn rank_store(config: &Config) -> Arc<dyn RankStore> {
    let dir = config
        .advisor
        .cache_dir
        .clone()
        .or_else(FileStore::default_dir);
    match dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => {
            warn!("No cache directory available; interruption ranks are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    }
}
