//! psi-sum configuration file handling
//!
//! One TOML file describes a local run: protocol tuning, logging, and where
//! each party's dataset comes from. Relative dataset paths are resolved
//! against the directory holding the config file.

use psi_sum::protocol::ProtocolConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PsiSumConfig {
    /// Protocol tuning shared by both parties
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub party_a: PartyAConfig,

    #[serde(default)]
    pub party_b: PartyBConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Party A's identifier set: inline entries and/or a file, one per line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartyAConfig {
    #[serde(default)]
    pub identifiers: Vec<String>,

    pub identifiers_file: Option<PathBuf>,
}

/// Party B's mapping: inline table and/or a `identifier,value` file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartyBConfig {
    #[serde(default)]
    pub values: BTreeMap<String, u64>,

    pub values_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl PsiSumConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: PsiSumConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        config
            .protocol
            .validate()
            .map_err(|e| format!("Invalid [protocol] in '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    #[allow(dead_code)]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Demo configuration: A = {apple, banana, cherry}, B = {apple: 100,
    /// cherry: 300, date: 50}, so the run prints 400.
    pub fn generate_default_toml() -> String {
        r#"# psi-sum configuration
#
# Both datasets live on this machine; the run plays both parties and prints
# the sum party B learns. Values of B whose identifiers are not in A's set
# do not contribute.

[protocol]
# Paillier modulus size in bits (even, >= 256)
modulus_bits = 2048

# Hash, blind and encrypt elements on all cores
parallel = true

# Pad round-1 and round-2 lists with dummies up to this many entries
# (0 = off; list sizes are then visible to the other party)
pad_to = 0

# Hash-to-group domain separator; both parties must use the same one
hash_domain = "psi-sum/v1/ristretto255"

[logging]
# Log level: trace, debug, info, warn, error (RUST_LOG overrides)
level = "info"

[party_a]
identifiers = ["apple", "banana", "cherry"]
# One identifier per line; relative to this file
# identifiers_file = "party_a.txt"

[party_b]
values = { apple = 100, cherry = 300, date = 50 }
# "identifier,value" per line; relative to this file
# values_file = "party_b.csv"
"#
        .to_string()
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Default config file location: `<config dir>/psi-sum/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("psi-sum")
        .join("config.toml")
}

/// Resolve a dataset path relative to the config file's directory
pub fn resolve_relative(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(path)
}
