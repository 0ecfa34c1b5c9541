//! Application configuration management.
//!
//! Settings are layered: built-in defaults, then the TOML file named on the
//! command line, then `LOGAUDIT_`-prefixed environment variables (with `__`
//! for nesting). A configuration that fails to load or validate is fatal at
//! startup; nothing in the pipeline runs against a partial config.

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;

/// Environment variable prefix for configuration overrides.
const ENV_PREFIX: &str = "LOGAUDIT_";

/// Errors raised while loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file was missing, malformed, or had the wrong shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The config loaded but one of its values is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Connection coordinates for the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Store host name or address.
    pub host: String,
    /// Store HTTP port.
    pub port: u16,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
        }
    }
}

/// Cursor pagination tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Documents fetched per page.
    pub page_size: usize,
    /// Cursor lease duration in seconds.
    pub lease_secs: u64,
    /// Hard cap on cursor advances per partition.
    pub max_advances: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            page_size: 1000,
            lease_secs: 120,
            max_advances: 1000,
        }
    }
}

/// Settings for the audit pipeline (check and dedup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Directory holding the canonical source log files.
    pub logs_dir: PathBuf,
    /// Directory receiving diff artifacts.
    pub output_dir: PathBuf,
    /// Artifact destination kind.
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Document fields hashed into the duplicate fingerprint, in order.
    pub hash_keys: Vec<String>,
    /// Partition name prefixes excluded from auditing.
    #[serde(default = "default_reserved_prefixes")]
    pub reserved_prefixes: Vec<String>,
    /// Document field holding the raw log line.
    #[serde(default = "default_message_field")]
    pub message_field: String,
    /// Diff worker pool size.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Cursor pagination tuning.
    #[serde(default)]
    pub scan: ScanSettings,
}

fn default_reserved_prefixes() -> Vec<String> {
    vec![".kibana".to_string(), ".metricbeat".to_string()]
}

fn default_message_field() -> String {
    "message".to_string()
}

fn default_workers() -> usize {
    4
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            output_dir: PathBuf::from("diff"),
            output_format: OutputFormat::default(),
            hash_keys: vec!["message".to_string()],
            reserved_prefixes: default_reserved_prefixes(),
            message_field: default_message_field(),
            workers: default_workers(),
            scan: ScanSettings::default(),
        }
    }
}

/// Settings for replaying diff artifacts to the ingester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReloadSettings {
    /// Ingester host name or address.
    pub host: String,
    /// Ingester TCP port.
    pub port: u16,
    /// Directory holding the diff artifacts to replay.
    pub input_dir: PathBuf,
    /// Artifact source kind.
    #[serde(default)]
    pub input_format: OutputFormat,
}

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Document store connection.
    #[serde(default)]
    pub store: StoreSettings,
    /// Audit pipeline settings.
    #[serde(default)]
    pub audit: AuditSettings,
    /// Reload settings; optional, the `reload` command requires it.
    #[serde(default)]
    pub reload: Option<ReloadSettings>,
}

impl Settings {
    /// Load settings from `path`, layered with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be parsed or a value fails
    /// validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.hash_keys.is_empty() {
            return Err(ConfigError::Invalid(
                "audit.hash_keys must name at least one field".to_string(),
            ));
        }
        if self.audit.workers == 0 {
            return Err(ConfigError::Invalid(
                "audit.workers must be at least 1".to_string(),
            ));
        }
        if self.audit.message_field.is_empty() {
            return Err(ConfigError::Invalid(
                "audit.message_field must not be empty".to_string(),
            ));
        }
        if self.audit.scan.page_size == 0 {
            return Err(ConfigError::Invalid(
                "audit.scan.page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.store.host, "localhost");
        assert_eq!(settings.store.port, 9200);
        assert_eq!(settings.audit.workers, 4);
        assert_eq!(settings.audit.message_field, "message");
        assert_eq!(
            settings.audit.reserved_prefixes,
            vec![".kibana".to_string(), ".metricbeat".to_string()]
        );
        assert_eq!(settings.audit.scan.page_size, 1000);
        assert_eq!(settings.audit.scan.lease_secs, 120);
        assert!(settings.reload.is_none());
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logaudit.toml");
        fs::write(
            &path,
            r#"
[store]
host = "store.internal"
port = 9201

[audit]
logs_dir = "/var/log/app"
output_dir = "/tmp/diff"
hash_keys = ["message", "host"]
workers = 8

[audit.scan]
page_size = 500
lease_secs = 60
max_advances = 200

[reload]
host = "ingest.internal"
port = 5044
input_dir = "/tmp/diff"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.store.host, "store.internal");
        assert_eq!(settings.store.port, 9201);
        assert_eq!(settings.audit.hash_keys, vec!["message", "host"]);
        assert_eq!(settings.audit.workers, 8);
        assert_eq!(settings.audit.scan.page_size, 500);
        // Unset fields keep their defaults.
        assert_eq!(settings.audit.message_field, "message");
        let reload = settings.reload.unwrap();
        assert_eq!(reload.host, "ingest.internal");
        assert_eq!(reload.input_format, OutputFormat::File);
    }

    #[test]
    fn test_invalid_toml_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logaudit.toml");
        fs::write(&path, "store = nonsense").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn test_empty_hash_keys_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logaudit.toml");
        fs::write(&path, "[audit]\nhash_keys = []\n").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logaudit.toml");
        fs::write(&path, "[audit]\nworkers = 0\n").unwrap();

        assert!(matches!(
            Settings::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
