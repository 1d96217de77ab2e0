//! CLI configuration: parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults. A missing
//! config file is not an error; every field has a default.

use anyhow::{Context, Result};
use heirvault_explorer::{ApiOverride, ExplorerConfig, Provider, DEFAULT_TIMEOUT_SECS};
use heirvault_plan::{Network, DEFAULT_CADENCE_RATIO};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "heirvault.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub general: GeneralSection,

    #[serde(default)]
    pub bitcoin: BitcoinSection,

    /// Esplora providers used by `status` and `broadcast`
    #[serde(default)]
    pub explorer: ExplorerSection,

    #[serde(default)]
    pub checkin: CheckInSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSection {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BitcoinSection {
    /// "mainnet", "testnet" or "regtest"
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for BitcoinSection {
    fn default() -> Self {
        Self {
            network: default_network(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerSection {
    /// Primary provider: "mempool" or "blockstream"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Retry once on the other provider when the primary fails
    #[serde(default = "default_fallback")]
    pub fallback: bool,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Self-hosted mempool API root, e.g. "http://umbrel.local:3006/api"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mempool_api: Option<String>,

    /// Self-hosted Esplora API root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockstream_api: Option<String>,
}

impl Default for ExplorerSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            fallback: default_fallback(),
            timeout_secs: default_timeout_secs(),
            mempool_api: None,
            blockstream_api: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInSection {
    /// Fraction of the locktime between check-ins (0.2 to 0.9)
    #[serde(default = "default_cadence_ratio")]
    pub cadence_ratio: f64,
}

impl Default for CheckInSection {
    fn default() -> Self {
        Self {
            cadence_ratio: default_cadence_ratio(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_log_level() -> String {
    "info".to_string()
}

fn default_network() -> String {
    "mainnet".to_string()
}

fn default_provider() -> String {
    "mempool".to_string()
}

fn default_fallback() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_cadence_ratio() -> f64 {
    DEFAULT_CADENCE_RATIO
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `HEIRVAULT_LOG_LEVEL`
    /// - `HEIRVAULT_NETWORK`
    /// - `HEIRVAULT_PROVIDER`
    /// - `HEIRVAULT_FALLBACK`
    /// - `HEIRVAULT_TIMEOUT_SECS`
    /// - `HEIRVAULT_CADENCE_RATIO`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("HEIRVAULT_LOG_LEVEL") {
            self.general.log_level = v;
        }
        if let Ok(v) = std::env::var("HEIRVAULT_NETWORK") {
            self.bitcoin.network = v;
        }
        if let Ok(v) = std::env::var("HEIRVAULT_PROVIDER") {
            self.explorer.provider = v;
        }
        if let Ok(v) = std::env::var("HEIRVAULT_FALLBACK") {
            if let Ok(enabled) = v.parse::<bool>() {
                self.explorer.fallback = enabled;
            }
        }
        if let Ok(v) = std::env::var("HEIRVAULT_TIMEOUT_SECS") {
            if let Ok(secs) = v.parse::<u64>() {
                self.explorer.timeout_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("HEIRVAULT_CADENCE_RATIO") {
            if let Ok(ratio) = v.parse::<f64>() {
                self.checkin.cadence_ratio = ratio;
            }
        }
    }

    pub fn network(&self) -> Result<Network> {
        self.bitcoin
            .network
            .parse()
            .context("bitcoin.network is not supported")
    }

    pub fn provider(&self) -> Result<Provider> {
        self.explorer
            .provider
            .parse()
            .context("explorer.provider is not supported")
    }

    /// Explorer settings; custom API roots serve `bitcoin.network` only.
    pub fn explorer_config(&self) -> Result<ExplorerConfig> {
        let network = self.network()?;
        let custom = |url: &Option<String>| url.as_ref().map(|u| ApiOverride::new(network, u));
        Ok(ExplorerConfig {
            timeout: Duration::from_secs(self.explorer.timeout_secs),
            mempool_api: custom(&self.explorer.mempool_api),
            blockstream_api: custom(&self.explorer.blockstream_api),
        })
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        self.network()?;
        self.provider()?;

        anyhow::ensure!(
            ["error", "warn", "info", "debug", "trace", "off"]
                .contains(&self.general.log_level.to_ascii_lowercase().as_str()),
            "general.log_level must be one of error, warn, info, debug, trace, off"
        );

        // 1 to 300 seconds
        anyhow::ensure!(
            (1..=300).contains(&self.explorer.timeout_secs),
            "explorer.timeout_secs must be between 1 and 300"
        );

        anyhow::ensure!(
            self.checkin.cadence_ratio.is_finite()
                && (0.2..=0.9).contains(&self.checkin.cadence_ratio),
            "checkin.cadence_ratio must be between 0.2 and 0.9"
        );

        for (key, url) in [
            ("explorer.mempool_api", &self.explorer.mempool_api),
            ("explorer.blockstream_api", &self.explorer.blockstream_api),
        ] {
            if let Some(url) = url {
                anyhow::ensure!(
                    url.starts_with("http://") || url.starts_with("https://"),
                    "{} must be an http(s) URL",
                    key
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
