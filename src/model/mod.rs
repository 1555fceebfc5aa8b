use thiserror::Error;

pub mod artifact;
pub mod coordinate;
pub mod metadata;
pub mod repositories;
pub mod version;

pub use artifact::{ArtifactCategory, ArtifactDescriptor, LocatedArtifact};
pub use coordinate::{ModuleCoordinate, ModuleSelector, VersionConstraint};
pub use metadata::{Configuration, ModuleMetadata};
pub use version::Version;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading configuration toml: {0}")]
    IO(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Descriptor is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("Missing TOML key `{0}` while parsing")]
    MissingKey(String),
    #[error("Invalid module coordinate `{0}`, expected `group:name:version`")]
    InvalidCoordinate(String),
    #[error("Invalid module selector `{0}`, expected `group:name[:constraint]`")]
    InvalidSelector(String),
    #[error("Invalid cache duration `{0}`, expected `always` or a number with an optional s/m/h/d suffix")]
    InvalidDuration(String),
    #[error("Descriptor declares module {found} but {expected} was requested")]
    CoordinateMismatch { expected: String, found: String },
    #[error("Configuration `{configuration}` extends undeclared configuration `{parent}`")]
    UndeclaredParent {
        configuration: String,
        parent: String,
    },
    #[error("Repository `{0}` is declared more than once")]
    DuplicateRepository(String),
    #[error("Unknown repository format `{0}`")]
    UnknownFormat(String),
}
