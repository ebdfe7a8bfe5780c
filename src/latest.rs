// src/latest.rs
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fs, path::Path};
use tracing::debug;

static RUN_DATE_DIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("run date regex is valid"));

/// Names of the `YYYYMMDD` directories directly under `output_root`.
/// A missing root has none.
pub fn run_date_dirs(output_root: &Path) -> Result<Vec<String>> {
    if !output_root.is_dir() {
        return Ok(Vec::new());
    }
    let mut dates = Vec::new();
    for entry in fs::read_dir(output_root)
        .with_context(|| format!("failed to list `{}`", output_root.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if RUN_DATE_DIR.is_match(name) {
                dates.push(name.to_string());
            }
        }
    }
    dates.sort();
    Ok(dates)
}

/// Whether `run_date` is the newest run under `output_root`. Zero-padded
/// `YYYYMMDD` names sort chronologically as plain strings.
pub fn is_latest_run(output_root: &Path, run_date: &str) -> Result<bool> {
    let dates = run_date_dirs(output_root)?;
    let latest = dates.last();
    debug!(run_date, latest = ?latest, "checked latest run");
    Ok(latest.is_some_and(|d| d == run_date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn newest_date_directory_wins() -> Result<()> {
        let root = TempDir::new()?;
        for d in ["20200528", "20200601", "20200530", "latest", "2020061"] {
            fs::create_dir(root.path().join(d))?;
        }
        fs::write(root.path().join("20991231"), b"not a dir")?;

        assert_eq!(
            run_date_dirs(root.path())?,
            vec!["20200528", "20200530", "20200601"]
        );
        assert!(is_latest_run(root.path(), "20200601")?);
        assert!(!is_latest_run(root.path(), "20200530")?);
        assert!(!is_latest_run(root.path(), "20991231")?);
        Ok(())
    }

    #[test]
    fn missing_root_is_never_latest() -> Result<()> {
        let root = TempDir::new()?;
        assert!(!is_latest_run(&root.path().join("nope"), "20200601")?);
        Ok(())
    }
}
