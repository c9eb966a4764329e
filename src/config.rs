use crate::advisor::client::SPOT_ADVISOR_URL;
use crate::error::{ConfigError, OptimizerError};
use crate::request::{Mode, DEFAULT_REGION};
use crate::validation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: DefaultsConfig,
    pub advisor: AdvisorConfig,
    pub catalog: CatalogConfig,
}

/// Values used when a request leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub region: String,
    pub mode: Mode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub url: String,
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Directory for persisted ranks (platform cache dir if not set)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Dataset to load instead of the bundled one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            mode: Mode::default(),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            url: SPOT_ADVISOR_URL.to_string(),
            ttl_secs: 3600,
            timeout_secs: 10,
            max_attempts: 3,
            cache_dir: None,
        }
    }
}

impl AdvisorConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Upper bound on a whole refresh: every attempt timing out, plus backoff
    pub fn fetch_timeout(&self) -> Duration {
        self.timeout() * self.max_attempts.max(1) + Duration::from_secs(10)
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .spot-optimizer.toml in current dir, then ~/.config/spot-optimizer/config.toml
            let local = PathBuf::from(".spot-optimizer.toml");
            if local.exists() {
                local
            } else {
                default_path()
            }
        };

        let config = if config_path.exists() {
            debug!("Loading config from {}", config_path.display());
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .map_err(|e| OptimizerError::from(ConfigError::ParseError(e.to_string())))
                .with_context(|| {
                    let mut err = format!("Failed to parse config: {}", config_path.display());
                    err.push_str("\n  Common issues:");
                    err.push_str("\n    - Invalid TOML syntax");
                    err.push_str("\n    - Incorrect value types (e.g. mode must be latency, fault_tolerance or balanced)");
                    err.push_str("\n  Tip: Run 'spot-optimizer init' to create a new config file");
                    err
                })?
        } else {
            if path.is_some() {
                warn!(
                    "Config file not found: {}; using default configuration",
                    config_path.display()
                );
            }
            Config::default()
        };

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            crate::utils::ensure_dir(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        validation::validate_region(&self.defaults.region).map_err(|e| {
            ConfigError::InvalidValue {
                field: "defaults.region".to_string(),
                reason: e.to_string(),
            }
        })?;
        if !self.advisor.url.starts_with("http://") && !self.advisor.url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "advisor.url".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.advisor.url),
            }
            .into());
        }
        if self.advisor.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advisor.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if self.advisor.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "advisor.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// `<config_dir>/spot-optimizer/config.toml`
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("spot-optimizer").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".spot-optimizer.toml"))
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}
