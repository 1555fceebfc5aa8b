use std::fmt::{Display, Write};

use thiserror::Error;

use crate::{
    cache::CacheError,
    model::{ModuleCoordinate, ParseError},
    transport::TransportError,
};

/// The four lookups every repository half answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListModuleVersions,
    ResolveComponentMetadata,
    ResolveModuleArtifacts,
    ResolveArtifact,
}

impl Operation {
    fn describe(&self) -> &'static str {
        match self {
            Operation::ListModuleVersions => "list versions",
            Operation::ResolveComponentMetadata => "resolve metadata",
            Operation::ResolveModuleArtifacts => "resolve artifacts",
            Operation::ResolveArtifact => "download artifact",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::ListModuleVersions => "list_module_versions",
            Operation::ResolveComponentMetadata => "resolve_component_metadata",
            Operation::ResolveModuleArtifacts => "resolve_module_artifacts",
            Operation::ResolveArtifact => "resolve_artifact",
        })
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Could not {} for {subject} from repository {repository}: {source}", .operation.describe())]
    Transport {
        operation: Operation,
        subject: String,
        repository: String,
        source: TransportError,
    },
    #[error("{}", offline_message(.operation, .subject))]
    Offline { operation: Operation, subject: String },
    #[error("Could not parse {subject} from repository {repository}: {source}")]
    Parse {
        subject: String,
        repository: String,
        source: ParseError,
    },
    #[error("Could not read cached {subject} for repository {repository}: {source}")]
    Cache {
        subject: String,
        repository: String,
        source: CacheError,
    },
    #[error("Configuration `{configuration}` is not declared by {module}")]
    UnknownConfiguration {
        module: ModuleCoordinate,
        configuration: String,
    },
    #[error("{}", exhausted_message(.operation, .subject, .failures))]
    Exhausted {
        operation: Operation,
        subject: String,
        failures: Vec<RepositoryFailure>,
    },
}

/// A failure reported by one repository of a chain.
#[derive(Debug)]
pub struct RepositoryFailure {
    pub repository: String,
    pub error: ResolveError,
}

impl ResolveError {
    pub fn offline(operation: Operation, subject: impl Display) -> ResolveError {
        ResolveError::Offline {
            operation,
            subject: subject.to_string(),
        }
    }

    /// True when the failure was caused by offline mode rather than by a repository.
    pub fn is_offline(&self) -> bool {
        match self {
            ResolveError::Offline { .. } => true,
            ResolveError::Exhausted { failures, .. } => {
                failures.iter().any(|failure| failure.error.is_offline())
            }
            _ => false,
        }
    }
}

fn offline_message(operation: &Operation, subject: &str) -> String {
    match operation {
        Operation::ListModuleVersions => format!(
            "No cached version listing for {subject} available for offline mode ({operation})"
        ),
        _ => format!("No cached version of {subject} available for offline mode ({operation})"),
    }
}

fn exhausted_message(
    operation: &Operation,
    subject: &str,
    failures: &[RepositoryFailure],
) -> String {
    let mut message = format!("Could not {} for {subject}:", operation.describe());
    for failure in failures {
        let _ = write!(message, "\n  - {}: {}", failure.repository, failure.error);
    }
    message
}

/// Terminal state of a resolution step.
#[derive(Debug)]
pub enum Resolution<T> {
    Resolved(T),
    Failed(ResolveError),
    /// The repository authoritatively reports that the module or artifact does not exist.
    Missing,
}

impl<T> Resolution<T> {
    fn state_name(&self) -> &'static str {
        match self {
            Resolution::Resolved(_) => "resolved",
            Resolution::Failed(_) => "failed",
            Resolution::Missing => "missing",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StateError {
    #[error("Resolve result has already been set to {0}")]
    AlreadySet(&'static str),
}

/// Write-once outcome of a resolution step.
///
/// An unset result means the step had no answer (for example a cache miss),
/// and the caller should move on to the next source. Once a terminal state is
/// recorded it can never be replaced.
#[derive(Debug)]
pub struct ResolveResult<T> {
    state: Option<Resolution<T>>,
}

impl<T> Default for ResolveResult<T> {
    fn default() -> Self {
        ResolveResult { state: None }
    }
}

impl<T> From<Resolution<T>> for ResolveResult<T> {
    fn from(resolution: Resolution<T>) -> Self {
        ResolveResult {
            state: Some(resolution),
        }
    }
}

impl<T> ResolveResult<T> {
    pub fn new() -> ResolveResult<T> {
        ResolveResult::default()
    }

    pub fn from_resolved(value: T) -> ResolveResult<T> {
        Resolution::Resolved(value).into()
    }

    pub fn from_failure(error: ResolveError) -> ResolveResult<T> {
        Resolution::Failed(error).into()
    }

    pub fn from_missing() -> ResolveResult<T> {
        Resolution::Missing.into()
    }

    pub fn try_resolved(&mut self, value: T) -> Result<(), StateError> {
        self.set(Resolution::Resolved(value))
    }

    pub fn try_failed(&mut self, error: ResolveError) -> Result<(), StateError> {
        self.set(Resolution::Failed(error))
    }

    pub fn try_missing(&mut self) -> Result<(), StateError> {
        self.set(Resolution::Missing)
    }

    /// # Panics
    ///
    /// Panics if the result has already been set.
    pub fn resolved(&mut self, value: T) {
        if let Err(error) = self.try_resolved(value) {
            panic!("{error}");
        }
    }

    /// # Panics
    ///
    /// Panics if the result has already been set.
    pub fn failed(&mut self, error: ResolveError) {
        if let Err(error) = self.try_failed(error) {
            panic!("{error}");
        }
    }

    /// # Panics
    ///
    /// Panics if the result has already been set.
    pub fn missing(&mut self) {
        if let Err(error) = self.try_missing() {
            panic!("{error}");
        }
    }

    fn set(&mut self, resolution: Resolution<T>) -> Result<(), StateError> {
        match &self.state {
            Some(existing) => Err(StateError::AlreadySet(existing.state_name())),
            None => {
                self.state = Some(resolution);
                Ok(())
            }
        }
    }

    pub fn is_set(&self) -> bool {
        self.state.is_some()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.state, Some(Resolution::Resolved(_)))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.state, Some(Resolution::Missing))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, Some(Resolution::Failed(_)))
    }

    pub fn resolution(&self) -> Option<&Resolution<T>> {
        self.state.as_ref()
    }

    pub fn value(&self) -> Option<&T> {
        match &self.state {
            Some(Resolution::Resolved(value)) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ResolveError> {
        match &self.state {
            Some(Resolution::Failed(error)) => Some(error),
            _ => None,
        }
    }

    pub fn into_resolution(self) -> Option<Resolution<T>> {
        self.state
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResolveResult<U> {
        ResolveResult {
            state: self.state.map(|resolution| match resolution {
                Resolution::Resolved(value) => Resolution::Resolved(f(value)),
                Resolution::Failed(error) => Resolution::Failed(error),
                Resolution::Missing => Resolution::Missing,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn offline_error() -> ResolveError {
        ResolveError::offline(
            Operation::ResolveComponentMetadata,
            ModuleCoordinate::new("g", "lib", "1.0"),
        )
    }

    type Setter = fn(&mut ResolveResult<u32>) -> Result<(), StateError>;

    fn set_resolved(result: &mut ResolveResult<u32>) -> Result<(), StateError> {
        result.try_resolved(1)
    }

    fn set_failed(result: &mut ResolveResult<u32>) -> Result<(), StateError> {
        result.try_failed(offline_error())
    }

    fn set_missing(result: &mut ResolveResult<u32>) -> Result<(), StateError> {
        result.try_missing()
    }

    const SETTERS: [(&str, Setter); 3] = [
        ("resolved", set_resolved),
        ("failed", set_failed),
        ("missing", set_missing),
    ];

    #[test]
    fn every_second_write_is_rejected() {
        for (first_state, first) in SETTERS {
            for (_, second) in SETTERS {
                let mut result = ResolveResult::new();
                assert_eq!(first(&mut result), Ok(()));
                assert_eq!(second(&mut result), Err(StateError::AlreadySet(first_state)));
            }
        }
    }

    #[test]
    fn first_write_survives_rejected_overwrite() {
        let mut result = ResolveResult::new();
        result.resolved(7);
        assert!(result.try_failed(offline_error()).is_err());
        assert_eq!(result.value(), Some(&7));
        assert!(result.is_resolved());
    }

    #[test]
    #[should_panic(expected = "already been set to failed")]
    fn panicking_setter_on_second_write() {
        let mut result: ResolveResult<u32> = ResolveResult::new();
        result.failed(offline_error());
        result.missing();
    }

    #[test]
    fn unset_result_has_no_state() {
        let result: ResolveResult<u32> = ResolveResult::new();
        assert!(!result.is_set());
        assert!(result.value().is_none());
        assert!(result.into_resolution().is_none());
    }

    #[test]
    fn offline_messages_name_operation_and_subject() {
        assert_eq!(
            offline_error().to_string(),
            "No cached version of g:lib:1.0 available for offline mode (resolve_component_metadata)"
        );
        assert_eq!(
            ResolveError::offline(Operation::ListModuleVersions, "g:lib:1.+").to_string(),
            "No cached version listing for g:lib:1.+ available for offline mode (list_module_versions)"
        );
    }

    #[test]
    fn exhausted_lists_every_repository() {
        let error = ResolveError::Exhausted {
            operation: Operation::ResolveComponentMetadata,
            subject: "g:lib:1.0".to_owned(),
            failures: vec![
                RepositoryFailure {
                    repository: "a".to_owned(),
                    error: offline_error(),
                },
                RepositoryFailure {
                    repository: "b".to_owned(),
                    error: ResolveError::UnknownConfiguration {
                        module: ModuleCoordinate::new("g", "lib", "1.0"),
                        configuration: "test".to_owned(),
                    },
                },
            ],
        };
        let message = error.to_string();
        assert!(message.starts_with("Could not resolve metadata for g:lib:1.0:"));
        assert!(message.contains("\n  - a: No cached version"));
        assert!(message.contains("\n  - b: Configuration `test`"));
        assert!(error.is_offline());
    }
}
