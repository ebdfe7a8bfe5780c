// src/pipeline.rs
use anyhow::Result;
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::aggregate::{summarize_region, summarize_state, SummaryTable};
use crate::config::PipelineConfig;
use crate::load::load_configured;
use crate::report::save_csv_by_scenario;

/// Load `run_date` and summarize it at state level.
pub fn generate_state_summary(config: &PipelineConfig, run_date: &str) -> Result<SummaryTable> {
    let records = load_configured(config, run_date)?;
    Ok(summarize_state(&records))
}

/// Load `run_date` and summarize it per region.
pub fn generate_region_summary(config: &PipelineConfig, run_date: &str) -> Result<SummaryTable> {
    let records = load_configured(config, run_date)?;
    Ok(summarize_region(&records))
}

/// Reports written by one [`run`].
#[derive(Debug, Default)]
pub struct RunOutput {
    pub state_reports: Vec<PathBuf>,
    pub region_reports: Vec<PathBuf>,
}

/// Load once, then write the state reports (no suffix) and the region
/// reports (`config.region_suffix`) into `{output_root}/{run_date}`.
#[instrument(level = "info", skip(config), fields(input = %config.input_dir(run_date).display()))]
pub fn run(config: &PipelineConfig, run_date: &str) -> Result<RunOutput> {
    let records = load_configured(config, run_date)?;

    let state = summarize_state(&records);
    let state_reports = save_csv_by_scenario(&state, &config.output_root, run_date, None)?;

    let region = summarize_region(&records);
    let region_reports = save_csv_by_scenario(
        &region,
        &config.output_root,
        run_date,
        config.region_suffix.as_deref(),
    )?;

    info!(
        state = state_reports.len(),
        region = region_reports.len(),
        "reports written"
    );
    Ok(RunOutput {
        state_reports,
        region_reports,
    })
}
