//! Configuration file (sqlite-clean.toml)

use crate::engine::DEFAULT_SAMPLE_LIMIT;
use crate::error::ConfigError;
use crate::rules::{NullTokens, RuleCatalog, DEFAULT_LIKE_NULLS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when no path is given
pub const CONFIG_FILE_NAME: &str = "sqlite-clean.toml";

/// Rule selection; entries are rule ids or tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Run only these rules (empty means all)
    #[serde(default)]
    pub enable: Vec<String>,

    /// Never run these rules
    #[serde(default)]
    pub disable: Vec<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Strings treated as stand-ins for NULL
    #[serde(default = "default_like_nulls")]
    pub like_nulls: Vec<String>,

    /// Distinct values sampled per column
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    #[serde(default)]
    pub rules: RulesConfig,
}

fn default_like_nulls() -> Vec<String> {
    DEFAULT_LIKE_NULLS.iter().map(|s| s.to_string()).collect()
}

fn default_sample_limit() -> usize {
    DEFAULT_SAMPLE_LIMIT
}

impl Default for Config {
    fn default() -> Self {
        Self {
            like_nulls: default_like_nulls(),
            sample_limit: default_sample_limit(),
            rules: RulesConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `sqlite-clean.toml` in `dir` if present,
    /// else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let candidate: PathBuf = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "Using config file");
            return Self::load(&candidate);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_limit == 0 {
            return Err(ConfigError::InvalidSampleLimit);
        }
        Ok(())
    }

    pub fn null_tokens(&self) -> NullTokens {
        NullTokens::new(self.like_nulls.as_slice())
    }

    /// Built-in catalog configured from this file
    pub fn catalog(&self) -> Result<RuleCatalog, ConfigError> {
        let mut catalog = RuleCatalog::builtin(&self.null_tokens());
        self.apply_to(&mut catalog)?;
        Ok(catalog)
    }

    /// Apply the enable/disable lists to `catalog`
    pub fn apply_to(&self, catalog: &mut RuleCatalog) -> Result<(), ConfigError> {
        catalog.enable_only(self.rules.enable.as_slice())?;
        for selector in &self.rules.disable {
            catalog.disable(selector)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.like_nulls, vec!["null", "none", "nan"]);
        assert_eq!(config.sample_limit, 10_000);
    }

    #[test]
    fn test_parse_full_file() {
        let config = Config::from_toml_str(
            r#"
            like_nulls = ["N/A", "-"]
            sample_limit = 50

            [rules]
            disable = ["L0003"]
            "#,
        )
        .unwrap();

        assert_eq!(config.like_nulls, vec!["N/A", "-"]);
        assert_eq!(config.sample_limit, 50);
        assert_eq!(config.rules.disable, vec!["L0003"]);
        assert!(config.null_tokens().matches("n/a"));
    }

    #[test]
    fn test_zero_sample_limit_rejected() {
        assert!(matches!(
            Config::from_toml_str("sample_limit = 0"),
            Err(ConfigError::InvalidSampleLimit)
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml_str("like_nulls = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_catalog_applies_rule_lists() {
        let mut config = Config::default();
        config.rules.enable = vec!["nulls".to_string()];
        config.rules.disable = vec!["L0003".to_string()];

        let catalog = config.catalog().unwrap();
        let enabled: Vec<&str> = catalog.enabled().map(|r| r.id()).collect();
        assert_eq!(enabled, vec!["L0002"]);
    }

    #[test]
    fn test_catalog_unknown_rule() {
        let mut config = Config::default();
        config.rules.disable = vec!["bogus".to_string()];
        assert!(matches!(config.catalog(), Err(ConfigError::UnknownRule(_))));
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap(), Config::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "sample_limit = 7").unwrap();
        assert_eq!(Config::discover(None, dir.path()).unwrap().sample_limit, 7);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::discover(Some(missing.as_path()), dir.path()),
            Err(ConfigError::Read { .. })
        ));
    }
}
