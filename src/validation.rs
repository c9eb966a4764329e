//! Input validation utilities
//!
//! Provides validation functions for request fields so invalid
//! input is rejected at the boundary as `InvalidRequest`.

use crate::error::{OptimizerError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Validate CPU core requirement
pub fn validate_cores(cores: i64) -> Result<u32> {
    if cores <= 0 {
        return Err(OptimizerError::invalid(
            "cores",
            format!("Cores must be positive, got: {}", cores),
        ));
    }
    u32::try_from(cores).map_err(|_| {
        OptimizerError::invalid("cores", format!("Cores value too large: {}", cores))
    })
}

/// Validate memory requirement in GB
pub fn validate_memory(memory: i64) -> Result<u32> {
    if memory <= 0 {
        return Err(OptimizerError::invalid(
            "memory",
            format!("Memory must be positive, got: {}", memory),
        ));
    }
    u32::try_from(memory).map_err(|_| {
        OptimizerError::invalid("memory", format!("Memory value too large: {}", memory))
    })
}

fn region_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z]{2}(-gov|-iso[a-z]*)?-[a-z]+-\d{1,2}$").expect("static regex is valid")
    })
}

/// Validate AWS region format
///
/// Regions look like `us-west-2`, `eu-central-1` or `us-gov-east-1`.
pub fn validate_region(region: &str) -> Result<()> {
    if region.is_empty() {
        return Err(OptimizerError::invalid("region", "Region cannot be empty"));
    }

    if !region_pattern().is_match(region) {
        return Err(OptimizerError::invalid(
            "region",
            format!("Region must look like 'us-west-2', got: {}", region),
        ));
    }

    Ok(())
}

/// Validate instance family filter entries
///
/// Families are short alphanumeric prefixes such as `m6i` or `r5`.
pub fn validate_instance_family(family: &str) -> Result<()> {
    if family.is_empty() {
        return Err(OptimizerError::invalid(
            "instance_family",
            "Instance family cannot be empty",
        ));
    }

    if !family.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(OptimizerError::invalid(
            "instance_family",
            format!(
                "Instance family can only contain alphanumeric characters, got: {}",
                family
            ),
        ));
    }

    Ok(())
}
