use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{fetch::DEFAULT_CONFIGURATION, model::ModuleSelector};

/// Resolves modules and their artifacts across an ordered chain of repositories.
#[derive(Debug, Parser)]
#[command(version)]
pub struct CliArgs {
    #[command(subcommand)]
    pub cmd: Command,
    /// Project root directory. Defaults to the current directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,
    /// Name of the file declaring the repositories
    #[arg(long, default_value = "artifetch.toml")]
    pub repositories_file: PathBuf,
    /// Location of the artifetch cache directory [default: $HOME/.artifetch/cache]
    #[arg(short, long)]
    pub cache_directory: Option<PathBuf>,
    /// Resolve from the cache only, never touching a repository
    #[arg(long)]
    pub offline: bool,
    /// Ignore cached entries and ask the repositories again
    #[arg(long)]
    pub refresh_dependencies: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolves modules given as group:name[:version] and the artifacts of a configuration
    Resolve {
        #[arg(required = true)]
        selectors: Vec<ModuleSelector>,
        /// Configuration whose artifacts are resolved
        #[arg(long, default_value = DEFAULT_CONFIGURATION)]
        configuration: String,
        /// Also resolve source artifacts
        #[arg(long)]
        sources: bool,
        /// Also resolve documentation artifacts
        #[arg(long)]
        javadoc: bool,
        /// Download every resolved artifact into the cache
        #[arg(short, long)]
        download: bool,
        /// Number of modules resolved in parallel
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Lists the published versions of a module
    Versions { selector: ModuleSelector },
    /// Cleans the artifetch cache
    ClearCache,
}
