//! HTTP client for the AWS Spot Instance Advisor feed
//!
//! The feed is a single JSON document covering every region. Only the
//! `Linux` section is used. Each request is bounded by a timeout and
//! retried with exponential backoff.

use super::{InterruptionRange, RankEntry, RateSource, RegionRanks};
use crate::error::{OptimizerError, Result};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

pub const SPOT_ADVISOR_URL: &str =
    "https://spot-bid-advisor.s3.amazonaws.com/spot-advisor-data.json";

const ADVISOR_OS: &str = "Linux";

#[derive(Debug, Deserialize)]
struct AdvisorDocument {
    #[serde(default)]
    ranges: Vec<InterruptionRange>,
    spot_advisor: HashMap<String, HashMap<String, HashMap<String, AdvisorScore>>>,
}

#[derive(Debug, Deserialize)]
struct AdvisorScore {
    s: Option<u32>,
    r: u32,
}

/// Parse the advisor document and keep only `region`
///
/// A region missing from the feed yields an empty table, not an error.
pub fn parse_advisor_document(body: &str, region: &str, origin: &str) -> Result<RegionRanks> {
    let document: AdvisorDocument = serde_json::from_str(body).map_err(|e| {
        OptimizerError::RateFetch {
            source_url: origin.to_string(),
            message: "malformed spot advisor document".to_string(),
            source: Some(Box::new(e)),
        }
    })?;

    let entries: BTreeMap<String, RankEntry> = document
        .spot_advisor
        .get(region)
        .and_then(|by_os| by_os.get(ADVISOR_OS))
        .map(|scores| {
            scores
                .iter()
                .map(|(name, score)| {
                    (
                        name.clone(),
                        RankEntry {
                            rank: score.r,
                            savings: score.s,
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    if entries.is_empty() {
        warn!("Spot advisor has no {} data for region {}", ADVISOR_OS, region);
    }

    Ok(RegionRanks::new(region, Utc::now(), document.ranges, entries))
}

/// Rate source backed by the public Spot Advisor JSON
pub struct SpotAdvisorClient {
    http: reqwest::Client,
    url: String,
    retry: ExponentialBackoffPolicy,
}

impl SpotAdvisorClient {
    pub fn new(url: impl Into<String>, timeout: Duration, max_attempts: u32) -> Result<Self> {
        let url = url.into();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| OptimizerError::RateFetch {
                source_url: url.clone(),
                message: "failed to build HTTP client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            http,
            url,
            retry: ExponentialBackoffPolicy::new(max_attempts),
        })
    }

    /// Client for the public feed with a 10s timeout and 3 attempts
    pub fn with_defaults() -> Result<Self> {
        Self::new(SPOT_ADVISOR_URL, Duration::from_secs(10), 3)
    }

    /// Override the retry policy (tests shorten the backoff)
    pub fn with_retry_policy(mut self, retry: ExponentialBackoffPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn download(&self) -> Result<String> {
        let response = self.http.get(&self.url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                "request failed".to_string()
            };
            OptimizerError::RateFetch {
                source_url: self.url.clone(),
                message,
                source: Some(Box::new(e)),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OptimizerError::rate_fetch(
                &self.url,
                format!("received status code {}", status.as_u16()),
            ));
        }

        response.text().await.map_err(|e| OptimizerError::RateFetch {
            source_url: self.url.clone(),
            message: "failed to read response body".to_string(),
            source: Some(Box::new(e)),
        })
    }
}

#[async_trait]
impl RateSource for SpotAdvisorClient {
    async fn fetch(&self, region: &str) -> Result<RegionRanks> {
        debug!("Fetching spot advisor data from {} for {}", self.url, region);
        let body = self.retry.execute_with_retry(|| self.download()).await?;
        parse_advisor_document(&body, region, &self.url)
    }

    fn origin(&self) -> String {
        self.url.clone()
    }
}
