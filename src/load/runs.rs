// src/load/runs.rs
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{debug, info, instrument};

use super::region::RegionFilter;
use super::source::{read_records, SourceFormat};
use crate::records::TaggedRecord;

static RUN_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("run token regex is valid"));

/// A source file belonging to one simulation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunFile {
    pub run_id: u64,
    pub path: PathBuf,
}

/// Run number embedded in `file_name`, if the name starts with `prefix`
/// and carries exactly one digit run between the prefix and the extension.
///
/// `Ok(None)` means the file is not a run file. A run number too large to
/// represent is an error rather than a silent skip.
pub fn parse_run_id(file_name: &str, prefix: &str) -> Result<Option<u64>> {
    let Some(rest) = file_name.strip_prefix(prefix) else {
        return Ok(None);
    };
    let Some((_, stem)) = SourceFormat::split_file_name(rest) else {
        return Ok(None);
    };
    let mut tokens = RUN_TOKEN.find_iter(stem);
    let (Some(token), None) = (tokens.next(), tokens.next()) else {
        return Ok(None);
    };
    let run_id = token.as_str().parse::<u64>().with_context(|| {
        format!(
            "run number `{}` of `{}` is out of range",
            token.as_str(),
            file_name
        )
    })?;
    Ok(Some(run_id))
}

/// List the run files in `dir`, sorted by file name. Files with no prefix
/// match, an unknown extension, or an ambiguous run number are left out.
pub fn discover_run_files(dir: &Path, prefix: &str) -> Result<Vec<RunFile>> {
    let mut files = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to list `{}`", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match parse_run_id(name, prefix)? {
            Some(run_id) => files.push(RunFile {
                run_id,
                path: path.clone(),
            }),
            None => debug!(file = %name, "not a run file, skipping"),
        }
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

/// Load every run file of one scenario directory and tag its rows with
/// the run number and `label`.
///
/// A missing directory is not an error: it is logged and yields no rows.
/// Files are decoded in parallel; the result is concatenated in file-name
/// order.
#[instrument(level = "info", skip(dir, filter), fields(dir = %dir.display()))]
pub fn load_scenario_runs(
    dir: &Path,
    label: &str,
    prefix: &str,
    filter: &RegionFilter,
) -> Result<Vec<TaggedRecord>> {
    if !dir.is_dir() {
        info!(scenario = %label, "no data for scenario, directory missing");
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let files = discover_run_files(dir, prefix)?;
    if files.is_empty() {
        info!(scenario = %label, prefix, "no run files found");
        return Ok(Vec::new());
    }

    let per_run = files
        .par_iter()
        .map(|f| -> Result<Vec<TaggedRecord>> {
            let rows = read_records(&f.path, filter)
                .with_context(|| format!("loading run {} of `{}`", f.run_id, label))?;
            Ok(rows
                .into_iter()
                .map(|r| TaggedRecord::new(label, f.run_id, r))
                .collect())
        })
        .collect::<Result<Vec<_>>>()?;

    let records: Vec<TaggedRecord> = per_run.into_iter().flatten().collect();
    info!(
        scenario = %label,
        runs = files.len(),
        rows = records.len(),
        elapsed = ?start.elapsed(),
        "scenario loaded"
    );
    Ok(records)
}
