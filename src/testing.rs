use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tempfile::TempDir;

use crate::{
    cache::{FileCacheStore, KeyedLocks},
    format::{PatternLayout, TomlDescriptorFormat},
    model::ModuleCoordinate,
    policy::ResolutionPolicy,
    repository::{ExternalRepository, RepositoryPort},
    transport::{FetchOutcome, Transport, TransportError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Fetch(String),
    Probe(String),
}

/// A transport over an in-memory map that records every call made to it.
#[derive(Default)]
pub struct MemoryTransport {
    resources: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<TransportCall>>,
    unreachable: bool,
}

impl MemoryTransport {
    pub fn new() -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport::default())
    }

    pub fn unreachable() -> Arc<MemoryTransport> {
        Arc::new(MemoryTransport {
            unreachable: true,
            ..Default::default()
        })
    }

    pub fn publish(&self, location: &str, bytes: impl Into<Vec<u8>>) {
        self.resources
            .lock()
            .unwrap()
            .insert(location.to_owned(), bytes.into());
    }

    /// Publishes a descriptor with a single `default` configuration and its jar.
    pub fn publish_module(&self, module: &ModuleCoordinate) {
        self.publish(&descriptor_location(module), descriptor(module));
        self.publish(&artifact_location(module, None), "binary");
    }

    pub fn publish_sources(&self, module: &ModuleCoordinate) {
        self.publish(&artifact_location(module, Some("sources")), "sources");
    }

    pub fn publish_versions(&self, group: &str, name: &str, versions: &[&str]) {
        let listing = versions
            .iter()
            .map(|version| format!("\"{version}\""))
            .collect::<Vec<_>>()
            .join(", ");
        self.publish(
            &format!("{group}/{name}/versions.toml"),
            format!("versions = [{listing}]"),
        );
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        let location = match &call {
            TransportCall::Fetch(location) | TransportCall::Probe(location) => location.clone(),
        };
        self.calls.lock().unwrap().push(call);
        if self.unreachable {
            Err(TransportError::Unreachable { location })
        } else {
            Ok(())
        }
    }
}

impl Transport for MemoryTransport {
    fn fetch(&self, location: &str) -> Result<FetchOutcome, TransportError> {
        self.record(TransportCall::Fetch(location.to_owned()))?;
        Ok(match self.resources.lock().unwrap().get(location) {
            Some(bytes) => FetchOutcome::Found(bytes.clone()),
            None => FetchOutcome::NotFound,
        })
    }

    fn probe_exists(&self, location: &str) -> Result<bool, TransportError> {
        self.record(TransportCall::Probe(location.to_owned()))?;
        Ok(self.resources.lock().unwrap().contains_key(location))
    }
}

pub fn descriptor_location(module: &ModuleCoordinate) -> String {
    format!(
        "{}/{}/{}/module-{}.toml",
        module.group, module.name, module.version, module.version
    )
}

pub fn artifact_location(module: &ModuleCoordinate, classifier: Option<&str>) -> String {
    let classifier = classifier.map(|c| format!("-{c}")).unwrap_or_default();
    format!(
        "{}/{}/{}/{}-{}{}.jar",
        module.group, module.name, module.version, module.name, module.version, classifier
    )
}

pub fn descriptor(module: &ModuleCoordinate) -> String {
    format!(
        r#"
        [module]
        group = "{}"
        name = "{}"
        version = "{}"

        [configurations.default]
        description = "Runtime classpath"

        [[configurations.default.artifacts]]
        name = "{}"
        "#,
        module.group, module.name, module.version, module.name
    )
}

/// A cache directory shared by every repository built from it.
pub struct CacheFixture {
    pub cache: Arc<FileCacheStore>,
    pub locks: Arc<KeyedLocks>,
    _directory: TempDir,
}

impl CacheFixture {
    pub fn new() -> CacheFixture {
        let directory = tempfile::tempdir().unwrap();
        let cache = FileCacheStore::new(directory.path().join("cache")).unwrap();
        CacheFixture {
            cache: Arc::new(cache),
            locks: Arc::new(KeyedLocks::new()),
            _directory: directory,
        }
    }

    pub fn repository(
        &self,
        name: &str,
        transport: Arc<MemoryTransport>,
        policy: &ResolutionPolicy,
    ) -> RepositoryPort {
        self.repository_with_layout(name, transport, policy, PatternLayout::default())
    }

    pub fn repository_with_layout(
        &self,
        name: &str,
        transport: Arc<MemoryTransport>,
        policy: &ResolutionPolicy,
        layout: PatternLayout,
    ) -> RepositoryPort {
        let port = ExternalRepository::new(
            name,
            Arc::new(TomlDescriptorFormat::new(layout)),
            self.cache.clone(),
            transport,
            policy.cache_rules(),
            self.locks.clone(),
        )
        .into_port();
        policy.override_repository(port)
    }
}
