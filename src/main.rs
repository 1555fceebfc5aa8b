use std::error::Error;

use artifetch::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::describe_report,
    },
    result::Resolution,
    Artifetch, ModuleReport, ResolveRequest,
};
use clap::Parser;
use log::{error, warn};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1)
        }
    }
}

/// Returns whether everything that was asked for resolved.
fn run() -> Result<bool, Box<dyn Error>> {
    let cli_args: CliArgs = CliArgs::parse();

    let mut builder = Artifetch::builder().repositories_file_name(&cli_args.repositories_file);
    if let Some(root) = &cli_args.root {
        builder = builder.root(root);
    }
    if let Some(cache_directory) = &cli_args.cache_directory {
        builder = builder.cache_directory(cache_directory);
    }
    // Unset flags leave the environment configuration in charge.
    if cli_args.offline {
        builder = builder.offline(true);
    }
    if cli_args.refresh_dependencies {
        builder = builder.refresh_dependencies(true);
    }
    if let Command::Resolve {
        jobs: Some(jobs), ..
    } = &cli_args.cmd
    {
        builder = builder.jobs(*jobs);
    }

    let artifetch = builder.try_build()?;

    match cli_args.cmd {
        Command::Resolve {
            selectors,
            configuration,
            sources,
            javadoc,
            download,
            jobs: _,
        } => {
            let request = ResolveRequest {
                configuration,
                sources,
                javadoc,
                download,
            };
            let reports = artifetch.resolve(selectors, &request)?;
            for report in &reports {
                print!("{}", describe_report(report));
            }
            Ok(reports.iter().all(ModuleReport::is_success))
        }
        Command::Versions { selector } => match artifetch.versions(&selector).into_resolution() {
            Some(Resolution::Resolved(versions)) => {
                for version in versions {
                    println!("{}", version.as_str());
                }
                Ok(true)
            }
            Some(Resolution::Failed(e)) => {
                error!("{}", e);
                Ok(false)
            }
            Some(Resolution::Missing) | None => {
                warn!("No repository lists versions of {}", selector);
                Ok(false)
            }
        },
        Command::ClearCache => {
            artifetch.clear_cache()?;
            Ok(true)
        }
    }
}
