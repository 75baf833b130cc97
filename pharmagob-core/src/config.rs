//! Configuration loading using Figment.
//!
//! Values are layered, later sources winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`pharmagob.toml` unless a path is given)
//! 3. `PHARMAGOB_` environment variables, nested with `__`
//!    (`PHARMAGOB_REPOSITORY__DEFAULT_LIMIT=100`)

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{error::RepositoryResult, page::PageLimits};

pub const DEFAULT_CONFIG_FILE: &str = "pharmagob.toml";
pub const ENV_PREFIX: &str = "PHARMAGOB_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PharmagobConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Connection settings for a document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub uri: String,
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "pharmagob".to_string(),
        }
    }
}

/// Settings shared by every repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Page size used when a caller does not pass one.
    pub default_limit: u64,
    /// Largest page size a caller may ask for.
    pub max_limit: u64,
    /// Lifetime of materialized report collections.
    pub report_ttl_secs: u64,
    /// Prefix of materialized report collection names.
    pub report_prefix: String,
}

impl RepositoryConfig {
    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.default_limit.max(1),
            max_limit: self.max_limit.max(self.default_limit).max(1),
        }
    }

    pub fn report_ttl(&self) -> Duration {
        Duration::from_secs(self.report_ttl_secs)
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_limit: 500,
            max_limit: 500,
            report_ttl_secs: 86_400,
            report_prefix: "report_".to_string(),
        }
    }
}

impl PharmagobConfig {
    /// Loads from `pharmagob.toml` in the working directory (if present) and the environment.
    pub fn load() -> RepositoryResult<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Loads from the given TOML file (if present) and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        Ok(Self::figment(path).extract()?)
    }

    fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(PharmagobConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config = PharmagobConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config, PharmagobConfig::default());
            assert_eq!(config.repository.default_limit, 500);
            assert_eq!(config.repository.report_ttl(), Duration::from_secs(86_400));
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "pharmagob.toml",
                r#"
                [store]
                uri = "mongodb://db:27017"
                database = "inventory"

                [repository]
                default_limit = 50
                "#,
            )?;

            let config = PharmagobConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.store.uri, "mongodb://db:27017");
            assert_eq!(config.store.database, "inventory");
            assert_eq!(config.repository.default_limit, 50);
            assert_eq!(config.repository.max_limit, 500);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[repository]\nreport_prefix = \"tmp_\"\n")?;
            jail.set_env("PHARMAGOB_REPOSITORY__REPORT_PREFIX", "stock_");
            jail.set_env("PHARMAGOB_REPOSITORY__MAX_LIMIT", "1000");

            let config = PharmagobConfig::load_from("custom.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.repository.report_prefix, "stock_");
            assert_eq!(config.repository.max_limit, 1000);
            Ok(())
        });
    }

    #[test]
    fn page_limits_never_below_default() {
        let config = RepositoryConfig { default_limit: 100, max_limit: 10, ..Default::default() };
        let limits = config.page_limits();

        assert_eq!(limits.default_limit, 100);
        assert_eq!(limits.max_limit, 100);
    }
}
