//! Optimization request and selection mode
//!
//! `OptimizationRequest` can only be obtained through `RequestBuilder::build`,
//! so every request in circulation has already been validated.

use crate::catalog::EmrVersion;
use crate::error::{OptimizerError, Result};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Region used when the caller does not name one
pub const DEFAULT_REGION: &str = "us-west-2";

/// Optimization objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fewer, larger nodes
    Latency,
    /// More, smaller nodes
    FaultTolerance,
    /// Trade-off between node count and waste
    Balanced,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Latency, Mode::FaultTolerance, Mode::Balanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Latency => "latency",
            Mode::FaultTolerance => "fault_tolerance",
            Mode::Balanced => "balanced",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Balanced
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latency" => Ok(Mode::Latency),
            "fault_tolerance" => Ok(Mode::FaultTolerance),
            "balanced" => Ok(Mode::Balanced),
            other => Err(OptimizerError::invalid(
                "mode",
                format!(
                    "Mode must be one of latency, fault_tolerance, balanced, got: {}",
                    other
                ),
            )),
        }
    }
}

/// A validated resource request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationRequest {
    cores: u32,
    memory: u32,
    region: String,
    ssd_only: bool,
    arm_instances: bool,
    instance_family: Vec<String>,
    emr_version: Option<EmrVersion>,
    mode: Mode,
}

impl OptimizationRequest {
    /// Start a request for `cores` vCPUs and `memory` GB; all other fields default.
    pub fn builder(cores: i64, memory: i64) -> RequestBuilder {
        RequestBuilder::new(cores, memory)
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn memory(&self) -> u32 {
        self.memory
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ssd_only(&self) -> bool {
        self.ssd_only
    }

    pub fn arm_instances(&self) -> bool {
        self.arm_instances
    }

    pub fn instance_family(&self) -> &[String] {
        &self.instance_family
    }

    pub fn emr_version(&self) -> Option<&EmrVersion> {
        self.emr_version.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}

/// Collects raw request fields and validates them in `build`
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    cores: i64,
    memory: i64,
    region: Option<String>,
    ssd_only: bool,
    arm_instances: bool,
    instance_family: Vec<String>,
    emr_version: Option<String>,
    mode: Option<String>,
}

impl RequestBuilder {
    fn new(cores: i64, memory: i64) -> Self {
        Self {
            cores,
            memory,
            region: None,
            ssd_only: false,
            arm_instances: false,
            instance_family: Vec::new(),
            emr_version: None,
            mode: None,
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn ssd_only(mut self, ssd_only: bool) -> Self {
        self.ssd_only = ssd_only;
        self
    }

    pub fn arm_instances(mut self, arm_instances: bool) -> Self {
        self.arm_instances = arm_instances;
        self
    }

    /// Add one family filter; may be called repeatedly
    pub fn instance_family(mut self, family: impl Into<String>) -> Self {
        self.instance_family.push(family.into());
        self
    }

    pub fn instance_families<I, S>(mut self, families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instance_family
            .extend(families.into_iter().map(Into::into));
        self
    }

    pub fn emr_version(mut self, version: impl Into<String>) -> Self {
        self.emr_version = Some(version.into());
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode.as_str().to_string());
        self
    }

    /// Set the mode from its wire name; unknown names fail in `build`
    pub fn mode_name(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn build(self) -> Result<OptimizationRequest> {
        let cores = validation::validate_cores(self.cores)?;
        let memory = validation::validate_memory(self.memory)?;

        let region = self.region.unwrap_or_else(|| DEFAULT_REGION.to_string());
        validation::validate_region(&region)?;

        for family in &self.instance_family {
            validation::validate_instance_family(family)?;
        }

        let emr_version = self
            .emr_version
            .as_deref()
            .map(EmrVersion::from_str)
            .transpose()?;

        let mode = match self.mode.as_deref() {
            Some(name) => name.parse()?,
            None => Mode::default(),
        };

        Ok(OptimizationRequest {
            cores,
            memory,
            region,
            ssd_only: self.ssd_only,
            arm_instances: self.arm_instances,
            instance_family: self.instance_family,
            emr_version,
            mode,
        })
    }
}
