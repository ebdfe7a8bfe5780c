// src/load/simulation.rs
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use super::region::RegionFilter;
use super::runs::load_scenario_runs;
use crate::config::{PipelineConfig, ScenarioDescriptor};
use crate::error::PipelineError;
use crate::records::TaggedRecord;

/// Directories under `base` matched by a scenario's path pattern, sorted.
/// The pattern may be a plain relative path or contain glob wildcards.
fn scenario_dirs(base: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full = format!(
        "{}/{}",
        Pattern::escape(&base.to_string_lossy()),
        pattern.trim_start_matches('/')
    );
    let mut dirs: Vec<PathBuf> = glob(&full)
        .with_context(|| format!("invalid scenario pattern `{}`", pattern))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(pattern, error = %e, "unreadable path while matching scenario");
                None
            }
        })
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Load every scenario of `catalog` for `run_date`, in catalog order.
///
/// Scenarios whose input directory is missing are logged and skipped. Raw
/// metric columns come back under their canonical names (see
/// [`crate::records::Metric`]). Ending up with no rows at all is fatal.
#[instrument(level = "info", skip(catalog, filter), fields(scenarios = catalog.len()))]
pub fn load_simulations(
    input_root: &Path,
    run_date: &str,
    catalog: &[ScenarioDescriptor],
    prefix: &str,
    filter: &RegionFilter,
) -> Result<Vec<TaggedRecord>> {
    let base = input_root.join(run_date);
    let mut records = Vec::new();

    for scenario in catalog {
        let dirs = scenario_dirs(&base, &scenario.input_path_pattern)?;
        if dirs.is_empty() {
            info!(
                scenario = %scenario.label,
                pattern = %scenario.input_path_pattern,
                "no data for scenario, skipping"
            );
            continue;
        }
        for dir in dirs {
            records.extend(load_scenario_runs(&dir, &scenario.label, prefix, filter)?);
        }
    }

    if records.is_empty() {
        return Err(PipelineError::NoData {
            input: input_root.to_path_buf(),
            run_date: run_date.to_string(),
        }
        .into());
    }

    info!(rows = records.len(), "simulations loaded");
    Ok(records)
}

/// [`load_simulations`] driven by a [`PipelineConfig`].
pub fn load_configured(config: &PipelineConfig, run_date: &str) -> Result<Vec<TaggedRecord>> {
    let filter = RegionFilter::new(&config.region_pattern)?;
    debug!(
        region = filter.as_str(),
        prefix = %config.metric_prefix,
        "loading configured scenarios"
    );
    load_simulations(
        &config.input_root,
        run_date,
        &config.scenarios,
        &config.metric_prefix,
        &filter,
    )
}
