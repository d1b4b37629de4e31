//! Configuration
//!
//! Connector, encryption and logging settings. Every field has a default;
//! several defaults fall back to environment variables so a deployment can
//! run without a config file.
//!
//! Timeouts are carried for the injected clients. Nothing in this crate
//! enforces them.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};
use crate::observability::{log_event, Event, Logger, Severity};
use crate::pagination::DEFAULT_LIMIT;
use crate::record::DEFAULT_DELIMITER;

/// Key/value table settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name (default: "undefined", matching an unconfigured deployment)
    #[serde(default = "default_table_name")]
    pub table_name: String,

    /// Client request timeout (default: DYNAMODB_TIMEOUT, TIMEOUT, or 1000).
    /// Read by the injected table client only.
    #[serde(default = "default_table_timeout")]
    pub timeout_ms: u64,

    /// Page size when a query carries no limit (default: 25)
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Sort key segment delimiter for aggregates built by
    /// `Connector::aggregate` (default: '|')
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Marshal empty strings/sets as null (default: false).
    /// Read by the injected table client only.
    #[serde(default)]
    pub convert_empty_values: bool,

    /// Drop undefined values when marshalling (default: true).
    /// Read by the injected table client only.
    #[serde(default = "default_true")]
    pub remove_undefined_values: bool,
}

/// Object store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Bucket name (default: BUCKET_NAME, or "undefined")
    #[serde(default = "default_bucket_name")]
    pub bucket_name: String,

    /// Client request timeout (default: S3_TIMEOUT, TIMEOUT, or 1000).
    /// Read by the injected object client only.
    #[serde(default = "default_object_timeout")]
    pub timeout_ms: u64,
}

/// Envelope encryption settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Field storing the encryption metadata (default: "eem")
    #[serde(default = "default_eem_field")]
    pub eem_field: String,

    /// Master key alias (default: MASTER_KEY_ALIAS)
    #[serde(default = "default_master_key_alias")]
    pub master_key_alias: Option<String>,

    /// Key regions (default: KMS_REGIONS, comma-separated)
    #[serde(default = "default_regions")]
    pub regions: Vec<String>,

    /// Use AES data keys (default: true)
    #[serde(default = "default_true")]
    pub aes: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level: trace, info, warn, error or off (default: AERODATA_LOG, or "warn")
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn env_u64(names: &[&str]) -> Option<u64> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find_map(|raw| raw.trim().parse().ok().filter(|v| *v > 0))
}

fn default_table_name() -> String {
    "undefined".to_string()
}

fn default_table_timeout() -> u64 {
    env_u64(&["DYNAMODB_TIMEOUT", "TIMEOUT"]).unwrap_or(1000)
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

fn default_true() -> bool {
    true
}

fn default_bucket_name() -> String {
    env::var("BUCKET_NAME").unwrap_or_else(|_| "undefined".to_string())
}

fn default_object_timeout() -> u64 {
    env_u64(&["S3_TIMEOUT", "TIMEOUT"]).unwrap_or(1000)
}

fn default_eem_field() -> String {
    "eem".to_string()
}

fn default_master_key_alias() -> Option<String> {
    env::var("MASTER_KEY_ALIAS").ok().filter(|s| !s.is_empty())
}

fn default_regions() -> Vec<String> {
    env::var("KMS_REGIONS")
        .map(|raw| split_regions(&raw))
        .unwrap_or_default()
}

fn split_regions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn default_log_level() -> String {
    env::var("AERODATA_LOG").unwrap_or_else(|_| "warn".to_string())
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            timeout_ms: default_table_timeout(),
            default_limit: default_limit(),
            delimiter: default_delimiter(),
            convert_empty_values: false,
            remove_undefined_values: true,
        }
    }
}

impl TableConfig {
    /// Create a config for the named table
    pub fn with_table(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            bucket_name: default_bucket_name(),
            timeout_ms: default_object_timeout(),
        }
    }
}

impl ObjectStoreConfig {
    /// Create a config for the named bucket
    pub fn with_bucket(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Default::default()
        }
    }
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            eem_field: default_eem_field(),
            master_key_alias: default_master_key_alias(),
            regions: default_regions(),
            aes: true,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    /// Parsed minimum severity; `None` when logging is off
    pub fn severity(&self) -> DataResult<Option<Severity>> {
        if self.level.trim().eq_ignore_ascii_case("off") {
            return Ok(None);
        }
        Severity::parse(&self.level)
            .map(Some)
            .ok_or_else(|| DataError::config(format!("unknown log level '{}'", self.level)))
    }

    /// Install the level as the process-wide logging threshold
    pub fn apply(&self) -> DataResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> DataResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| DataError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| DataError::config(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        log_event(
            Event::ConfigLoaded,
            &[
                ("bucket", config.object_store.bucket_name.as_str()),
                ("table", config.table.table_name.as_str()),
            ],
        );

        Ok(config)
    }

    /// Reject settings the connectors cannot work with
    pub fn validate(&self) -> DataResult<()> {
        if self.table.default_limit == 0 {
            return Err(DataError::config("default_limit must be > 0"));
        }
        if self.encryption.eem_field.is_empty() {
            return Err(DataError::config("eem_field must not be empty"));
        }
        self.log.severity()?;
        Ok(())
    }
}
