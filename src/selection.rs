//! Node sizing and mode-specific ranking
//!
//! Every candidate is sized to the smallest node count that covers both the
//! core and the memory request. Candidates are then ordered by a mode
//! specific key; the first one wins. Ties always end on the instance name so
//! identical inputs give identical answers.
//!
//! - latency: node count asc, rank asc, slack asc, name
//! - fault_tolerance: node count desc (capped), rank asc, slack asc, name
//! - balanced: `NODE_WEIGHT * count + SLACK_WEIGHT * slack` asc, rank asc, name

use crate::catalog::InstanceType;
use crate::query::Candidate;
use crate::request::Mode;
use std::cmp::Ordering;

/// Largest node count fault_tolerance will prefer
///
/// Candidates needing more nodes than this rank after every candidate within
/// the cap, nearest-to-cap first.
pub const MAX_FAULT_TOLERANCE_NODES: u64 = 50;

/// Balanced-mode cost per node
pub const NODE_WEIGHT: f64 = 4.0;

/// Balanced-mode cost per unit of slack (one vCPU or one GiB)
pub const SLACK_WEIGHT: f64 = 1.0;

/// Smallest count with `count·vcpu >= cores` and `count·memory >= memory`
pub fn node_count(cores: u32, memory: u32, instance: &InstanceType) -> u64 {
    let vcpu = u64::from(instance.vcpu.max(1));
    let by_cores = u64::from(cores).div_ceil(vcpu);

    let mut by_memory = (f64::from(memory) / instance.memory_gib).ceil() as u64;
    // Guard against the division rounding down for fractional GiB sizes
    while (by_memory as f64) * instance.memory_gib < f64::from(memory) {
        by_memory += 1;
    }

    by_cores.max(by_memory).max(1)
}

/// Unused vCPUs plus unused GiB at `count` nodes
pub fn slack(cores: u32, memory: u32, instance: &InstanceType, count: u64) -> f64 {
    let core_slack = (count * u64::from(instance.vcpu)).saturating_sub(u64::from(cores)) as f64;
    let memory_slack = (count as f64 * instance.memory_gib - f64::from(memory)).max(0.0);
    core_slack + memory_slack
}

/// A candidate with its computed node count
#[derive(Debug, Clone, PartialEq)]
pub struct SizedCandidate<'a> {
    pub candidate: Candidate<'a>,
    pub count: u64,
    pub slack: f64,
}

impl<'a> SizedCandidate<'a> {
    pub fn new(candidate: Candidate<'a>, cores: u32, memory: u32) -> Self {
        let count = node_count(cores, memory, candidate.instance);
        let slack = slack(cores, memory, candidate.instance, count);
        Self {
            candidate,
            count,
            slack,
        }
    }

    pub fn instance(&self) -> &'a InstanceType {
        self.candidate.instance
    }

    pub fn balanced_cost(&self) -> f64 {
        NODE_WEIGHT * self.count as f64 + SLACK_WEIGHT * self.slack
    }

    fn within_fault_tolerance_cap(&self) -> bool {
        self.count <= MAX_FAULT_TOLERANCE_NODES
    }
}

fn by_name(a: &SizedCandidate<'_>, b: &SizedCandidate<'_>) -> Ordering {
    a.instance().name.cmp(&b.instance().name)
}

fn by_rank(a: &SizedCandidate<'_>, b: &SizedCandidate<'_>) -> Ordering {
    a.candidate.rank_key().cmp(&b.candidate.rank_key())
}

fn by_slack(a: &SizedCandidate<'_>, b: &SizedCandidate<'_>) -> Ordering {
    a.slack.total_cmp(&b.slack)
}

fn fault_tolerance_count(a: &SizedCandidate<'_>, b: &SizedCandidate<'_>) -> Ordering {
    match (a.within_fault_tolerance_cap(), b.within_fault_tolerance_cap()) {
        (true, true) => b.count.cmp(&a.count),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.count.cmp(&b.count),
    }
}

/// Total order for `mode`; `Less` means preferred
pub fn compare(mode: Mode, a: &SizedCandidate<'_>, b: &SizedCandidate<'_>) -> Ordering {
    match mode {
        Mode::Latency => a
            .count
            .cmp(&b.count)
            .then_with(|| by_rank(a, b))
            .then_with(|| by_slack(a, b))
            .then_with(|| by_name(a, b)),
        Mode::FaultTolerance => fault_tolerance_count(a, b)
            .then_with(|| by_rank(a, b))
            .then_with(|| by_slack(a, b))
            .then_with(|| by_name(a, b)),
        Mode::Balanced => a
            .balanced_cost()
            .total_cmp(&b.balanced_cost())
            .then_with(|| by_rank(a, b))
            .then_with(|| by_name(a, b)),
    }
}

/// Size and sort every candidate, best first
pub fn rank_candidates<'a>(
    candidates: Vec<Candidate<'a>>,
    cores: u32,
    memory: u32,
    mode: Mode,
) -> Vec<SizedCandidate<'a>> {
    let mut sized: Vec<SizedCandidate<'a>> = candidates
        .into_iter()
        .map(|c| SizedCandidate::new(c, cores, memory))
        .collect();
    sized.sort_by(|a, b| compare(mode, a, b));
    sized
}

/// The winning candidate, or `None` when there is nothing to choose from
pub fn select<'a>(
    candidates: Vec<Candidate<'a>>,
    cores: u32,
    memory: u32,
    mode: Mode,
) -> Option<SizedCandidate<'a>> {
    candidates
        .into_iter()
        .map(|c| SizedCandidate::new(c, cores, memory))
        .min_by(|a, b| compare(mode, a, b))
}
