use std::{error::Error, fmt::Write};

use log::{error, info, warn};

use crate::{
    cache::CacheStore,
    chain::RepositoryChain,
    fetch::{self, ModuleReport, ResolveRequest},
    model::ModuleSelector,
    result::Resolution,
};

/// Handler to resolve command
pub fn do_resolve(
    chain: &RepositoryChain,
    selectors: Vec<ModuleSelector>,
    request: &ResolveRequest,
    jobs: usize,
) -> Result<Vec<ModuleReport>, Box<dyn Error>> {
    let reports = fetch::resolve_modules(chain, selectors, request, jobs)?;

    for report in &reports {
        match report.metadata.resolution() {
            Some(Resolution::Resolved(metadata)) if report.is_success() => {
                info!("Resolved {} to {}", report.selector, metadata.coordinate)
            }
            Some(Resolution::Missing) | None => {
                warn!("Could not find {}", report.selector)
            }
            _ => {
                for failure in report.failures() {
                    error!("{}", failure);
                }
            }
        }
    }

    Ok(reports)
}

pub fn do_clear_cache(cache: &dyn CacheStore) -> Result<(), Box<dyn Error>> {
    cache.clear()?;
    Ok(())
}

/// Human readable summary of a report, one line per artifact.
pub fn describe_report(report: &ModuleReport) -> String {
    let mut output = String::new();
    match report.metadata.resolution() {
        Some(Resolution::Resolved(metadata)) => {
            let _ = writeln!(output, "{} -> {}", report.selector, metadata.coordinate);
        }
        Some(Resolution::Failed(_)) => {
            let _ = writeln!(output, "{} -> FAILED", report.selector);
        }
        Some(Resolution::Missing) | None => {
            let _ = writeln!(output, "{} -> NOT FOUND", report.selector);
        }
    }

    for (category, artifacts) in &report.artifacts {
        match artifacts.resolution() {
            Some(Resolution::Resolved(artifacts)) => {
                let _ = writeln!(output, "  {}: {} artifact(s)", category, artifacts.len());
                for artifact in artifacts {
                    let _ = writeln!(output, "    {}", artifact);
                }
            }
            Some(Resolution::Failed(_)) => {
                let _ = writeln!(output, "  {}: FAILED", category);
            }
            Some(Resolution::Missing) | None => {
                let _ = writeln!(output, "  {}: NOT FOUND", category);
            }
        }
    }

    for (artifact, download) in &report.downloads {
        match download.value() {
            Some(located) => {
                let _ = writeln!(output, "  {} -> {}", artifact, located.path.display());
            }
            None => {
                let _ = writeln!(output, "  {} -> NOT DOWNLOADED", artifact);
            }
        }
    }

    for failure in report.failures() {
        let _ = writeln!(output, "  error: {}", failure);
    }

    output
}
