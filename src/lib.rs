pub mod cache;
pub mod chain;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod flock;
pub mod format;
pub mod model;
pub mod policy;
pub mod repository;
pub mod result;
pub mod transport;

mod api;
#[cfg(test)]
mod testing;

pub use api::{Artifetch, ArtifetchBuilder};
pub use fetch::{ModuleReport, ResolveRequest};
