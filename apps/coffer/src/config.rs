//! # Configuration
//!
//! Layered configuration, lowest precedence first:
//! 1. Built-in defaults
//! 2. `coffer.toml` (or the file given with `--config`)
//! 3. `COFFER_*` environment variables
//! 4. CLI flags (applied by the caller)
//!
//! ## Environment Variables
//!
//! - `COFFER_DATA`: local slot database path
//! - `COFFER_SLOT_QUOTA`: local slot quota in bytes
//! - `COFFER_REMOTE_TEMPLATE`: URL template for bare endpoint identifiers
//! - `COFFER_REMOTE_TIMEOUT_SECS`: remote request timeout
//! - `COFFER_REMOTE_MIGRATION`: `one-way` or `reversible`
//! - `COFFER_SERVE_DATA`: blob database of the endpoint server
//! - `COFFER_DEPLOYMENTS`: comma-separated deployment ids served by `coffer serve`
//! - `COFFER_RATE_LIMIT`: server requests per second (0 disables)
//! - `COFFER_CORS_ORIGINS`: comma-separated allowed origins, or `*`

use crate::coordinator::RemoteMigration;
use crate::remote::{DEFAULT_URL_TEMPLATE, ID_PLACEHOLDER};
use coffer_core::CofferError;
use coffer_core::primitives::DEFAULT_SLOT_QUOTA_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Config file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_FILE: &str = "coffer.toml";

// =============================================================================
// SECTIONS
// =============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CofferConfig {
    /// redb file holding the local slots.
    pub data_path: PathBuf,
    /// Byte quota of the local slot store.
    pub slot_quota_bytes: u64,
    pub remote: RemoteConfig,
    pub server: ServerConfig,
}

impl Default for CofferConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("coffer.redb"),
            slot_quota_bytes: DEFAULT_SLOT_QUOTA_BYTES,
            remote: RemoteConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Remote endpoint client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// Template for bare identifiers; must contain `{id}`.
    pub url_template: String,
    pub timeout_secs: u64,
    pub migration: RemoteMigration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout_secs: 30,
            migration: RemoteMigration::default(),
        }
    }
}

impl RemoteConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `coffer serve` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// redb file holding one blob per deployment.
    pub data_path: PathBuf,
    /// Deployment ids accepted in `/macros/s/{deployment}/exec`.
    pub deployments: Vec<String>,
    /// Requests per second across all clients; 0 disables limiting.
    pub rate_limit: u32,
    /// Allowed CORS origins. Empty means localhost only, `["*"]` means any.
    pub cors_origins: Vec<String>,
    /// Largest accepted request body.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
            data_path: PathBuf::from("coffer-endpoint.redb"),
            deployments: vec!["local".to_string()],
            rate_limit: 100,
            cors_origins: Vec::new(),
            body_limit_bytes: 8 * 1024 * 1024,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, CofferError> {
    raw.trim()
        .parse()
        .map_err(|_| CofferError::ConfigError(format!("{} has an invalid value: {:?}", key, raw)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl CofferConfig {
    /// Parse a TOML document.
    pub fn from_toml(text: &str) -> Result<Self, CofferError> {
        toml::from_str(text).map_err(|e| CofferError::ConfigError(e.to_string()))
    }

    /// Read and parse a config file.
    pub fn from_file(path: &Path) -> Result<Self, CofferError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CofferError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
            .map_err(|e| CofferError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// Defaults, then the config file, then the process environment.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CofferError> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `COFFER_*` overrides from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CofferError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("COFFER_DATA") {
            self.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("COFFER_SLOT_QUOTA") {
            self.slot_quota_bytes = parse_env("COFFER_SLOT_QUOTA", &v)?;
        }
        if let Some(v) = lookup("COFFER_REMOTE_TEMPLATE") {
            self.remote.url_template = v;
        }
        if let Some(v) = lookup("COFFER_REMOTE_TIMEOUT_SECS") {
            self.remote.timeout_secs = parse_env("COFFER_REMOTE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("COFFER_REMOTE_MIGRATION") {
            self.remote.migration = v.trim().parse()?;
        }
        if let Some(v) = lookup("COFFER_SERVE_DATA") {
            self.server.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("COFFER_DEPLOYMENTS") {
            self.server.deployments = split_list(&v);
        }
        if let Some(v) = lookup("COFFER_RATE_LIMIT") {
            self.server.rate_limit = parse_env("COFFER_RATE_LIMIT", &v)?;
        }
        if let Some(v) = lookup("COFFER_CORS_ORIGINS") {
            self.server.cors_origins = split_list(&v);
        }
        Ok(())
    }

    /// Reject settings that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), CofferError> {
        let template = &self.remote.url_template;
        if !template.contains(ID_PLACEHOLDER) {
            return Err(CofferError::ConfigError(format!(
                "remote.url_template must contain {}: {:?}",
                ID_PLACEHOLDER, template
            )));
        }
        if !(template.starts_with("http://") || template.starts_with("https://")) {
            return Err(CofferError::ConfigError(format!(
                "remote.url_template must be an http(s) URL: {:?}",
                template
            )));
        }
        if self.remote.timeout_secs == 0 {
            return Err(CofferError::ConfigError(
                "remote.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.server.deployments.is_empty() {
            return Err(CofferError::ConfigError(
                "server.deployments must name at least one deployment".to_string(),
            ));
        }
        if let Some(bad) = self
            .server
            .deployments
            .iter()
            .find(|d| d.is_empty() || d.contains(['/', '?', '#']))
        {
            return Err(CofferError::ConfigError(format!(
                "Invalid deployment id {:?}",
                bad
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = CofferConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.remote.migration, RemoteMigration::OneWay);
        assert_eq!(config.slot_quota_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CofferConfig::from_toml(
            r#"
            data_path = "/var/lib/coffer/slots.redb"

            [remote]
            migration = "reversible"
            "#,
        )
        .expect("parse");

        assert_eq!(config.data_path, PathBuf::from("/var/lib/coffer/slots.redb"));
        assert_eq!(config.remote.migration, RemoteMigration::Reversible);
        assert_eq!(config.remote.timeout_secs, 30);
        assert_eq!(config.server.port, 8787);
    }

    #[test]
    fn unknown_keys_rejected() {
        let result = CofferConfig::from_toml("colour = \"blue\"");
        assert!(matches!(result, Err(CofferError::ConfigError(_))));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = CofferConfig::default();
        config
            .apply_overrides(env(&[
                ("COFFER_REMOTE_MIGRATION", "reversible"),
                ("COFFER_RATE_LIMIT", "0"),
                ("COFFER_DEPLOYMENTS", "home, office ,"),
                ("COFFER_CORS_ORIGINS", "*"),
            ]))
            .expect("overrides");

        assert_eq!(config.remote.migration, RemoteMigration::Reversible);
        assert_eq!(config.server.rate_limit, 0);
        assert_eq!(config.server.deployments, vec!["home", "office"]);
        assert_eq!(config.server.cors_origins, vec!["*"]);
    }

    #[test]
    fn bad_env_value_is_config_error() {
        let mut config = CofferConfig::default();
        let result = config.apply_overrides(env(&[("COFFER_SLOT_QUOTA", "lots")]));
        assert!(matches!(result, Err(CofferError::ConfigError(_))));
    }

    #[test]
    fn template_without_placeholder_rejected() {
        let mut config = CofferConfig::default();
        config.remote.url_template = "https://example.com/exec".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn deployment_with_slash_rejected() {
        let mut config = CofferConfig::default();
        config.server.deployments = vec!["a/b".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_file_loaded_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("coffer.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").expect("write");

        let config = CofferConfig::from_file(&path).expect("load");
        assert_eq!(config.server.port, 9000);
    }
}
