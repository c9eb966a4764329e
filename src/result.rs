//! Optimization results
//!
//! Assembles the final answer from the winning candidate. No decisions are
//! made here; the only check is that the allocation covers the request.

use crate::error::OptimizerError;
use crate::request::{Mode, OptimizationRequest};
use crate::selection::SizedCandidate;
use serde::{Serialize, Serializer};
use std::fmt;

/// Message reported when no instance type qualifies
pub const NO_SUITABLE_INSTANCE: &str = "No suitable instance type found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceAllocation {
    #[serde(rename = "type")]
    pub instance_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reliability {
    pub interruption_rank: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interruption_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings: Option<u32>,
}

/// Whole GiB values serialize as integers (`32`, not `32.0`)
fn serialize_gib<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && *value >= 0.0 && *value < u64::MAX as f64 {
        serializer.serialize_u64(*value as u64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub instances: InstanceAllocation,
    pub mode: Mode,
    pub total_cores: u64,
    #[serde(serialize_with = "serialize_gib")]
    pub total_ram: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliability: Option<Reliability>,
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} ({} mode): {} vCPU, {} GiB",
            self.instances.count,
            self.instances.instance_type,
            self.mode,
            self.total_cores,
            self.total_ram
        )
    }
}

/// Which request-level failure produced an `ErrorResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NoCandidate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResult {
    #[serde(skip)]
    pub kind: ErrorKind,
    pub error: String,
}

impl ErrorResult {
    pub fn no_candidate() -> Self {
        Self {
            kind: ErrorKind::NoCandidate,
            error: NO_SUITABLE_INSTANCE.to_string(),
        }
    }
}

impl fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

impl From<OptimizerError> for ErrorResult {
    fn from(err: OptimizerError) -> Self {
        match err {
            OptimizerError::NoCandidate { message } => Self {
                kind: ErrorKind::NoCandidate,
                error: message,
            },
            other => Self {
                kind: ErrorKind::InvalidRequest,
                error: other.to_string(),
            },
        }
    }
}

/// Either a recommendation or a structured error
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptimizationOutcome {
    Success(OptimizationResult),
    Error(ErrorResult),
}

impl OptimizationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OptimizationOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<OptimizationResult, ErrorResult> {
        match self {
            OptimizationOutcome::Success(result) => Ok(result),
            OptimizationOutcome::Error(err) => Err(err),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Build the outcome for `request` from the selected candidate
///
/// # Panics
///
/// If the allocation does not cover the requested cores and memory. That can
/// only happen through a sizing bug, never through user input.
pub fn format_outcome(
    winner: Option<SizedCandidate<'_>>,
    request: &OptimizationRequest,
) -> OptimizationOutcome {
    let Some(winner) = winner else {
        return OptimizationOutcome::Error(ErrorResult::no_candidate());
    };

    let instance = winner.instance();
    let total_cores = winner.count * u64::from(instance.vcpu);
    let total_ram = winner.count as f64 * instance.memory_gib;

    assert!(
        total_cores >= u64::from(request.cores()) && total_ram >= f64::from(request.memory()),
        "allocation {} x {} ({} vCPU, {} GiB) does not cover request ({} vCPU, {} GiB)",
        winner.count,
        instance.name,
        total_cores,
        total_ram,
        request.cores(),
        request.memory()
    );

    let reliability = winner.candidate.rank.as_ref().map(|rank| Reliability {
        interruption_rank: rank.rank,
        interruption_label: rank.label.clone(),
        savings: rank.savings,
    });

    OptimizationOutcome::Success(OptimizationResult {
        instances: InstanceAllocation {
            instance_type: instance.name.clone(),
            count: winner.count,
        },
        mode: request.mode(),
        total_cores,
        total_ram,
        reliability,
    })
}
