//! Configuration
//!
//! Stored in `~/.config/credflow/config.toml` unless `--config` points elsewhere.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. CLI flags
//! 2. Environment variables (`CREDFLOW_INJECTION_IMAGE`, `CREDFLOW_STORE_DIR`, `CREDFLOW_LOG`),
//!    including those set through a `.env` file
//! 3. Config file
//! 4. Defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CredflowError, Result};
use crate::planner::PlannerConfig;

pub const ENV_INJECTION_IMAGE: &str = "CREDFLOW_INJECTION_IMAGE";
pub const ENV_STORE_DIR: &str = "CREDFLOW_STORE_DIR";
pub const ENV_LOG: &str = "CREDFLOW_LOG";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub injection: InjectionConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Settings of the synthesized `run-injection` node
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InjectionConfig {
    pub image: String,
    pub command: Vec<String>,
    pub service_account: Option<String>,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        let planner = PlannerConfig::default();
        Self {
            image: planner.image,
            command: planner.command,
            service_account: planner.service_account,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Directory of manifests backing the object store
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns `~/.config/credflow/` on Unix, `%APPDATA%/credflow/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("credflow")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load `path`, or the default location when `None`
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| CredflowError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CredflowError::Config {
            reason: format!("Failed to parse config file: {}", e),
        })
    }

    /// Merge with the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Merge with variables from `lookup`; empty values are ignored
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(image) = var(ENV_INJECTION_IMAGE) {
            self.injection.image = image;
        }
        if let Some(dir) = var(ENV_STORE_DIR) {
            self.store.dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = var(ENV_LOG) {
            self.log.filter = filter;
        }
        self
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            image: self.injection.image.clone(),
            command: self.injection.command.clone(),
            service_account: self.injection.service_account.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_contains_credflow() {
        let path = Config::config_path();
        assert!(path.to_string_lossy().contains("credflow"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::from_toml(
            r#"
[injection]
image = "registry.local/credflow:2.0"
service_account = "injector"

[store]
dir = "/var/lib/credflow"
"#,
        )
        .unwrap();

        assert_eq!(config.injection.image, "registry.local/credflow:2.0");
        assert_eq!(config.injection.command, vec!["credflow", "inject"]);
        assert_eq!(config.store.dir, Some(PathBuf::from("/var/lib/credflow")));
        assert_eq!(config.log.filter, "info");

        let planner = config.planner_config();
        assert_eq!(planner.service_account.as_deref(), Some("injector"));
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_INJECTION_IMAGE, "env-image:1"),
            (ENV_STORE_DIR, ""),
            (ENV_LOG, "credflow=debug"),
        ]);
        let config = Config::default().with_env_from(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.injection.image, "env-image:1");
        assert_eq!(config.store.dir, None);
        assert_eq!(config.log.filter, "credflow=debug");
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credflow.toml");
        fs::write(&path, "[log]\nfilter = \"warn\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log.filter, "warn");

        let missing = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(missing, Err(CredflowError::Config { .. })));
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            Config::from_toml("[injection\nimage = 1"),
            Err(CredflowError::Config { .. })
        ));
    }
}
