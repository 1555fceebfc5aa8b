use std::{fmt::Display, str::FromStr, time::Duration};

use log::{debug, warn};

use crate::{model::ParseError, repository::RepositoryPort};

const DEFAULT_TRUST_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a cached entry may be used without asking the remote side again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    AlwaysTrust,
    TrustFor(Duration),
}

impl CachePolicy {
    pub fn is_fresh(&self, age: Duration) -> bool {
        match self {
            CachePolicy::AlwaysTrust => true,
            CachePolicy::TrustFor(window) => age < *window,
        }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::TrustFor(DEFAULT_TRUST_WINDOW)
    }
}

impl FromStr for CachePolicy {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().to_ascii_lowercase();
        if trimmed == "always" {
            return Ok(CachePolicy::AlwaysTrust);
        }
        let (amount, unit) = match trimmed.find(|c: char| !c.is_ascii_digit()) {
            Some(index) => trimmed.split_at(index),
            None => (trimmed.as_str(), "s"),
        };
        let amount = amount
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidDuration(value.to_owned()))?;
        let seconds = match unit {
            "s" => amount,
            "m" => amount.saturating_mul(60),
            "h" => amount.saturating_mul(60 * 60),
            "d" => amount.saturating_mul(24 * 60 * 60),
            _ => return Err(ParseError::InvalidDuration(value.to_owned())),
        };
        Ok(CachePolicy::TrustFor(Duration::from_secs(seconds)))
    }
}

impl Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachePolicy::AlwaysTrust => f.write_str("always"),
            CachePolicy::TrustFor(window) => write!(f, "{}s", window.as_secs()),
        }
    }
}

/// Kinds of cached entries, each with its own trust window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCategory {
    /// Version listings used to resolve dynamic constraints.
    Dependency,
    /// Module descriptors.
    Module,
    /// Artifact content and probe results.
    Artifact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheRules {
    pub dependencies: CachePolicy,
    pub modules: CachePolicy,
    pub artifacts: CachePolicy,
}

impl CacheRules {
    pub fn uniform(policy: CachePolicy) -> CacheRules {
        CacheRules {
            dependencies: policy,
            modules: policy,
            artifacts: policy,
        }
    }

    pub fn policy(&self, category: CacheCategory) -> CachePolicy {
        match category {
            CacheCategory::Dependency => self.dependencies,
            CacheCategory::Module => self.modules,
            CacheCategory::Artifact => self.artifacts,
        }
    }

    pub fn is_fresh(&self, category: CacheCategory, age: Duration) -> bool {
        self.policy(category).is_fresh(age)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    Offline,
    Refresh,
    Cached,
}

/// Session-wide resolution settings. Built once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionPolicy {
    offline: bool,
    refresh: bool,
    rules: CacheRules,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        ResolutionPolicy::new(false, false, CacheRules::default())
    }
}

impl ResolutionPolicy {
    pub fn new(offline: bool, refresh: bool, rules: CacheRules) -> ResolutionPolicy {
        if offline && refresh {
            warn!("Ignoring refresh of dependencies in offline mode");
        }
        ResolutionPolicy {
            offline,
            refresh,
            rules,
        }
    }

    pub fn mode(&self) -> ResolutionMode {
        if self.offline {
            ResolutionMode::Offline
        } else if self.refresh {
            ResolutionMode::Refresh
        } else {
            ResolutionMode::Cached
        }
    }

    /// The configured rules as overridden by offline and refresh mode.
    pub fn cache_rules(&self) -> CacheRules {
        match self.mode() {
            ResolutionMode::Offline => CacheRules::uniform(CachePolicy::AlwaysTrust),
            ResolutionMode::Refresh => CacheRules::uniform(CachePolicy::TrustFor(Duration::ZERO)),
            ResolutionMode::Cached => self.rules,
        }
    }

    pub fn configured_rules(&self) -> CacheRules {
        self.rules
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn is_refresh(&self) -> bool {
        self.refresh
    }

    /// Decorates a repository so that it honours offline mode.
    pub fn override_repository(&self, repository: RepositoryPort) -> RepositoryPort {
        match self.mode() {
            ResolutionMode::Offline => {
                debug!("Disabling remote access to {} (offline)", repository.name());
                repository.offline()
            }
            _ => repository,
        }
    }
}
