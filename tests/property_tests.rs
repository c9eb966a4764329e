//! Property-based tests for sizing and selection
//!
//! These tests use proptest to generate requests and rank tables and check
//! that the selection invariants hold for every one of them.

use proptest::prelude::*;
use spot_optimizer::advisor::{RankEntry, RegionRanks};
use spot_optimizer::catalog::{Architecture, StorageKind};
use spot_optimizer::query::annotate;
use spot_optimizer::request::{Mode, OptimizationRequest};
use spot_optimizer::result::format_outcome;
use spot_optimizer::selection::{node_count, select};
use spot_optimizer::Catalog;
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| Catalog::bundled().unwrap())
}

const REGIONS: [&str; 4] = ["us-west-2", "us-east-1", "eu-west-1", "sa-east-1"];

fn mode_strategy() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Latency),
        Just(Mode::FaultTolerance),
        Just(Mode::Balanced)
    ]
}

/// Random ranks for a random subset of the catalog
fn ranks_strategy(region: &'static str) -> impl Strategy<Value = RegionRanks> {
    let names: Vec<String> = catalog().iter().map(|i| i.name.clone()).collect();
    prop::collection::vec(prop::option::of(0u32..5), names.len()).prop_map(move |ranks| {
        let entries: BTreeMap<String, RankEntry> = names
            .iter()
            .zip(ranks)
            .filter_map(|(name, rank)| {
                rank.map(|rank| {
                    (
                        name.clone(),
                        RankEntry {
                            rank,
                            savings: None,
                        },
                    )
                })
            })
            .collect();
        RegionRanks::new(region, chrono::Utc::now(), Vec::new(), entries)
    })
}

fn request(
    cores: u32,
    memory: u32,
    region: &str,
    ssd_only: bool,
    arm: bool,
    mode: Mode,
) -> OptimizationRequest {
    OptimizationRequest::builder(i64::from(cores), i64::from(memory))
        .region(region)
        .ssd_only(ssd_only)
        .arm_instances(arm)
        .mode(mode)
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn test_winner_covers_request_with_minimal_count(
        cores in 1u32..600,
        memory in 1u32..4000,
        region_idx in 0usize..REGIONS.len(),
        ssd_only in any::<bool>(),
        arm in any::<bool>(),
        mode in mode_strategy(),
        ranks in ranks_strategy("us-west-2"),
    ) {
        let region = REGIONS[region_idx];
        let request = request(cores, memory, region, ssd_only, arm, mode);
        let candidates = annotate(catalog(), &request, &ranks);
        prop_assert!(!candidates.is_empty());

        let winner = select(candidates, cores, memory, mode).unwrap();
        let instance = winner.instance();
        let count = winner.count;

        prop_assert!(count * u64::from(instance.vcpu) >= u64::from(cores));
        prop_assert!(count as f64 * instance.memory_gib >= f64::from(memory));
        let fewer = count - 1;
        prop_assert!(
            fewer * u64::from(instance.vcpu) < u64::from(cores)
                || (fewer as f64) * instance.memory_gib < f64::from(memory)
        );
        prop_assert_eq!(count, node_count(cores, memory, instance));

        if ssd_only {
            prop_assert_eq!(instance.storage, StorageKind::Ssd);
        }
        if !arm {
            prop_assert_eq!(instance.architecture, Architecture::X86_64);
        }
        prop_assert!(instance.is_available_in(region));

        // The formatter's own invariant check must agree
        prop_assert!(format_outcome(Some(winner), &request).is_success());
    }

    #[test]
    fn test_latency_never_uses_more_nodes_than_fault_tolerance(
        cores in 1u32..1000,
        memory in 1u32..8000,
        ssd_only in any::<bool>(),
        arm in any::<bool>(),
        ranks in ranks_strategy("us-east-1"),
    ) {
        let latency_request = request(cores, memory, "us-east-1", ssd_only, arm, Mode::Latency);
        let latency = select(
            annotate(catalog(), &latency_request, &ranks),
            cores,
            memory,
            Mode::Latency,
        )
        .unwrap();
        let fault_tolerance = select(
            annotate(catalog(), &latency_request, &ranks),
            cores,
            memory,
            Mode::FaultTolerance,
        )
        .unwrap();
        prop_assert!(latency.count <= fault_tolerance.count);
    }

    #[test]
    fn test_selection_is_deterministic(
        cores in 1u32..300,
        memory in 1u32..2000,
        mode in mode_strategy(),
        ranks in ranks_strategy("eu-west-1"),
    ) {
        let request = request(cores, memory, "eu-west-1", false, true, mode);
        let first = format_outcome(
            select(annotate(catalog(), &request, &ranks), cores, memory, mode),
            &request,
        );
        let second = format_outcome(
            select(annotate(catalog(), &request, &ranks), cores, memory, mode),
            &request,
        );
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_adding_filters_never_grows_candidates(
        cores in 1u32..64,
        memory in 1u32..256,
        family_idx in 0usize..4,
    ) {
        let families = ["m", "r5", "c6", "i3"];
        let ranks = RegionRanks::neutral("us-west-2");
        let base = request(cores, memory, "us-west-2", false, true, Mode::Balanced);
        let narrowed = OptimizationRequest::builder(i64::from(cores), i64::from(memory))
            .arm_instances(true)
            .ssd_only(true)
            .instance_family(families[family_idx])
            .build()
            .unwrap();

        let all: Vec<String> = annotate(catalog(), &base, &ranks)
            .into_iter()
            .map(|c| c.instance.name.clone())
            .collect();
        let subset = annotate(catalog(), &narrowed, &ranks);
        prop_assert!(subset.len() <= all.len());
        for candidate in subset {
            prop_assert!(all.contains(&candidate.instance.name));
            prop_assert!(candidate.instance.family.starts_with(families[family_idx]));
        }
    }
}
