//! Instance catalog
//!
//! An immutable table of EC2 instance types, loaded once at startup from the
//! bundled dataset (or an override path) and shared by reference afterwards.
//! The catalog only applies hard eligibility filters; per-node sizing lives in
//! `crate::selection`.

use crate::error::{OptimizerError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Dataset schema this build understands
pub const CATALOG_SCHEMA_VERSION: u32 = 1;

const BUNDLED_CATALOG: &str = include_str!("../data/instance_catalog.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Ssd,
    Hdd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Ssd => f.write_str("ssd"),
            StorageKind::Hdd => f.write_str("hdd"),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_64 => f.write_str("x86_64"),
            Architecture::Arm64 => f.write_str("arm64"),
        }
    }
}

/// Dotted numeric EMR release label such as `6.10.0`
///
/// Missing trailing components compare as zero, so `6.10` == `6.10.0`.
#[derive(Debug, Clone)]
pub struct EmrVersion(Vec<u32>);

impl EmrVersion {
    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for EmrVersion {
    type Err = OptimizerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_start_matches("emr-");
        let parts = trimmed
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                OptimizerError::invalid(
                    "emr_version",
                    format!("EMR version must look like '6.10.0', got: {}", s),
                )
            })?;
        if parts.is_empty() || parts.len() > 4 {
            return Err(OptimizerError::invalid(
                "emr_version",
                format!("EMR version must have 1-4 components, got: {}", s),
            ));
        }
        Ok(EmrVersion(parts))
    }
}

impl Ord for EmrVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        for i in 0..len {
            let a = self.0.get(i).copied().unwrap_or(0);
            let b = other.0.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for EmrVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EmrVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EmrVersion {}

impl fmt::Display for EmrVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl Serialize for EmrVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EmrVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One EC2 instance type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceType {
    pub name: String,
    pub vcpu: u32,
    pub memory_gib: f64,
    pub storage: StorageKind,
    pub architecture: Architecture,
    pub family: String,
    pub generation: u32,
    #[serde(default)]
    pub emr_min_version: Option<EmrVersion>,
    pub regions: BTreeSet<String>,
}

impl InstanceType {
    pub fn is_available_in(&self, region: &str) -> bool {
        self.regions.contains(region)
    }

    /// Family equals, or starts with, one of the requested families
    pub fn matches_family<S: AsRef<str>>(&self, families: &[S]) -> bool {
        families
            .iter()
            .any(|f| self.family.starts_with(f.as_ref()))
    }

    /// EMR release `version` can run on this instance type
    pub fn supports_emr(&self, version: &EmrVersion) -> bool {
        self.emr_min_version
            .as_ref()
            .map(|min| min <= version)
            .unwrap_or(false)
    }
}

/// Hard eligibility filters; all present filters must pass
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    pub storage: Option<StorageKind>,
    pub architecture: Option<Architecture>,
    pub families: Vec<String>,
    pub region: Option<String>,
    pub emr_version: Option<EmrVersion>,
}

impl CatalogFilter {
    pub fn matches(&self, instance: &InstanceType) -> bool {
        if let Some(storage) = self.storage {
            if instance.storage != storage {
                return false;
            }
        }
        if let Some(arch) = self.architecture {
            if instance.architecture != arch {
                return false;
            }
        }
        if !self.families.is_empty() && !instance.matches_family(&self.families) {
            return false;
        }
        if let Some(region) = &self.region {
            if !instance.is_available_in(region) {
                return false;
            }
        }
        if let Some(version) = &self.emr_version {
            if !instance.supports_emr(version) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    schema_version: u32,
    #[serde(default)]
    generated_at: Option<String>,
    instance_types: Vec<InstanceType>,
}

/// Immutable instance catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    instances: Vec<InstanceType>,
    generated_at: Option<String>,
}

impl Catalog {
    /// Build a catalog from records, checking the per-record invariants
    pub fn new(mut instances: Vec<InstanceType>) -> Result<Self> {
        let mut seen = HashSet::new();
        for instance in &instances {
            if instance.vcpu == 0 || !(instance.memory_gib > 0.0) {
                return Err(OptimizerError::CatalogLoad {
                    path: "<records>".to_string(),
                    reason: format!(
                        "{} must have positive vCPU and memory (vcpu={}, memory_gib={})",
                        instance.name, instance.vcpu, instance.memory_gib
                    ),
                });
            }
            if !seen.insert(instance.name.as_str()) {
                return Err(OptimizerError::CatalogLoad {
                    path: "<records>".to_string(),
                    reason: format!("duplicate instance type: {}", instance.name),
                });
            }
        }
        instances.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self {
            instances,
            generated_at: None,
        })
    }

    /// Load the dataset compiled into the binary
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG, "<bundled>")
    }

    /// Load a dataset file, typically a newer weekly snapshot
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OptimizerError::CatalogLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    pub fn from_json(content: &str, origin: &str) -> Result<Self> {
        let document: CatalogDocument =
            serde_json::from_str(content).map_err(|e| OptimizerError::CatalogLoad {
                path: origin.to_string(),
                reason: format!("malformed dataset: {}", e),
            })?;

        if document.schema_version != CATALOG_SCHEMA_VERSION {
            return Err(OptimizerError::CatalogLoad {
                path: origin.to_string(),
                reason: format!(
                    "unsupported schema version {} (expected {})",
                    document.schema_version, CATALOG_SCHEMA_VERSION
                ),
            });
        }

        let mut catalog = Self::new(document.instance_types).map_err(|e| match e {
            OptimizerError::CatalogLoad { reason, .. } => OptimizerError::CatalogLoad {
                path: origin.to_string(),
                reason,
            },
            other => other,
        })?;
        catalog.generated_at = document.generated_at;

        debug!(
            "Loaded {} instance types from {}",
            catalog.instances.len(),
            origin
        );
        Ok(catalog)
    }

    /// Instance types passing every filter, in name order
    pub fn query(&self, filter: &CatalogFilter) -> Vec<&InstanceType> {
        self.instances.iter().filter(|i| filter.matches(i)).collect()
    }

    pub fn get(&self, name: &str) -> Option<&InstanceType> {
        self.instances
            .binary_search_by(|i| i.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.instances[idx])
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn generated_at(&self) -> Option<&str> {
        self.generated_at.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceType> {
        self.instances.iter()
    }
}
