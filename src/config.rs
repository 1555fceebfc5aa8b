use std::{collections::HashMap, path::PathBuf};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::policy::{CachePolicy, CacheRules};

pub struct ArtifetchConfig {
    pub cache_dir: Option<PathBuf>,
    pub offline: bool,
    pub refresh: bool,
    pub rules: CacheRules,
}

impl ArtifetchConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::from_raw(RawConfig::load(None)?)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let defaults = CacheRules::default();
        let trust = |value: Option<String>, default: CachePolicy| match value {
            Some(value) => value.parse::<CachePolicy>(),
            None => Ok(default),
        };

        Ok(Self {
            cache_dir: raw_config.cache.dir,
            offline: raw_config.resolution.offline.unwrap_or(false),
            refresh: raw_config.resolution.refresh.unwrap_or(false),
            rules: CacheRules {
                dependencies: trust(raw_config.trust.dependencies, defaults.dependencies)?,
                modules: trust(raw_config.trust.modules, defaults.modules)?,
                artifacts: trust(raw_config.trust.artifacts, defaults.artifacts)?,
            },
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    resolution: ResolutionConfig,
    #[serde(default)]
    trust: TrustConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CacheConfig {
    dir: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct ResolutionConfig {
    offline: Option<bool>,
    refresh: Option<bool>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct TrustConfig {
    dependencies: Option<String>,
    modules: Option<String>,
    artifacts: Option<String>,
}

impl RawConfig {
    fn load(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("ARTIFETCH")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
