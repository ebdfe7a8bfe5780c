// src/report.rs
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, StringArray},
    csv::WriterBuilder,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, instrument, warn};

use crate::aggregate::{Granularity, Statistic, SummaryRow, SummaryTable, DATE_COLUMN};
use crate::error::PipelineError;
use crate::load::source::REGION_COLUMN;
use crate::records::{days_since_epoch, Metric};

pub const REPORT_EXTENSION: &str = "csv";

/// `No Intervention` + `county` → `No_Intervention.county.csv`
///
/// Path separators in the label become `_` as well, so every report lands
/// directly in the run directory.
pub fn report_file_name(scenario: &str, suffix: Option<&str>) -> String {
    let stem = scenario.replace([' ', '/', '\\'], "_");
    match suffix {
        Some(s) if !s.is_empty() => format!("{}.{}.{}", stem, s, REPORT_EXTENSION),
        _ => format!("{}.{}", stem, REPORT_EXTENSION),
    }
}

/// Build the output batch for one scenario's rows. The scenario column is
/// dropped; the rest follow the table's fixed column order.
pub fn partition_batch(granularity: Granularity, rows: &[&SummaryRow]) -> Result<RecordBatch> {
    let mut fields = vec![Field::new(DATE_COLUMN, DataType::Date32, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Date32Array::from(
        rows.iter()
            .map(|r| days_since_epoch(r.key.date))
            .collect::<Vec<_>>(),
    ))];

    if granularity == Granularity::Region {
        fields.push(Field::new(REGION_COLUMN, DataType::Utf8, false));
        columns.push(Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.key.region_id.as_deref().unwrap_or_default()),
        )));
    }

    for metric in Metric::ALL {
        for stat in Statistic::ALL {
            fields.push(Field::new(
                format!("{}{}", metric.as_str(), stat.suffix()),
                DataType::Float64,
                false,
            ));
            columns.push(Arc::new(Float64Array::from(
                rows.iter()
                    .map(|r| r.summary(metric).get(stat))
                    .collect::<Vec<_>>(),
            )));
        }
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building report batch")
}

/// Write `batch` as CSV with a header row, replacing `path` as a whole.
/// On failure the temporary file is removed and `path` is left untouched.
fn write_csv(path: &Path, batch: &RecordBatch) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    let result = write_and_replace(&tmp_path, path, batch);
    if result.is_err() && tmp_path.exists() {
        if let Err(e) = fs::remove_file(&tmp_path) {
            warn!(path = %tmp_path.display(), error = %e, "could not remove temporary file");
        }
    }
    result
}

fn write_and_replace(tmp_path: &Path, path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(tmp_path)
        .with_context(|| format!("could not create temporary file `{}`", tmp_path.display()))?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));
    writer
        .write(batch)
        .with_context(|| format!("writing `{}`", tmp_path.display()))?;
    writer
        .into_inner()
        .flush()
        .with_context(|| format!("flushing `{}`", tmp_path.display()))?;

    fs::rename(tmp_path, path).with_context(|| {
        format!(
            "failed to rename `{}` to `{}`",
            tmp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// Write one CSV per scenario of `table` into `{output_root}/{run_date}`.
///
/// The directory must already exist, and the table must hold at least one
/// scenario. Returns the written paths in scenario order.
#[instrument(level = "info", skip(table, output_root), fields(rows = table.rows.len()))]
pub fn save_csv_by_scenario(
    table: &SummaryTable,
    output_root: &Path,
    run_date: &str,
    suffix: Option<&str>,
) -> Result<Vec<PathBuf>> {
    if table.is_empty() {
        return Err(PipelineError::NoScenarios.into());
    }
    let out_dir = output_root.join(run_date);
    if !out_dir.is_dir() {
        return Err(PipelineError::MissingOutputDir(out_dir).into());
    }

    let partitions = table.partitions();
    let mut written = Vec::with_capacity(partitions.len());
    for (scenario, rows) in partitions {
        let path = out_dir.join(report_file_name(scenario, suffix));
        let batch = partition_batch(table.granularity, &rows)?;
        write_csv(&path, &batch)?;
        info!(scenario = %scenario, rows = rows.len(), path = %path.display(), "wrote report");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{stat_columns, summarize_region, summarize_state};
    use crate::records::{Metrics, RawRecord, TaggedRecord};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn record(scenario: &str, run: u64, region: &str, d: u32, deaths: f64) -> TaggedRecord {
        let mut metrics = Metrics::default();
        metrics.set(Metric::NewDeaths, deaths);
        TaggedRecord::new(
            scenario,
            run,
            RawRecord {
                region_id: region.to_string(),
                date: NaiveDate::from_ymd_opt(2020, 6, d).unwrap(),
                metrics,
            },
        )
    }

    fn sample() -> Vec<TaggedRecord> {
        vec![
            record("No Intervention", 1, "06001", 1, 10.0),
            record("No Intervention", 2, "06001", 1, 20.0),
            record("No Intervention", 3, "06001", 1, 30.0),
            record("No Intervention", 1, "06001", 2, 1.0),
            record("Continued Lockdown", 1, "06001", 1, 4.0),
            record("Continued Lockdown", 1, "06003", 1, 6.0),
        ]
    }

    #[test]
    fn file_names_replace_spaces_and_append_suffix() {
        assert_eq!(report_file_name("No Intervention", None), "No_Intervention.csv");
        assert_eq!(
            report_file_name("Slow-paced Reopening", Some("county")),
            "Slow-paced_Reopening.county.csv"
        );
        assert_eq!(report_file_name("A B", Some("")), "A_B.csv");
        assert_eq!(
            report_file_name("Reopen/Phase 2", Some("county")),
            "Reopen_Phase_2.county.csv"
        );
    }

    #[test]
    fn labels_with_separators_stay_in_run_directory() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir(root.path().join("20200601"))?;
        let table = summarize_state(&[record("Reopen/Phase 2", 1, "06001", 1, 3.0)]);

        let paths = save_csv_by_scenario(&table, root.path(), "20200601", None)?;
        assert_eq!(paths, vec![root.path().join("20200601/Reopen_Phase_2.csv")]);
        assert!(paths[0].is_file());
        Ok(())
    }

    #[test]
    fn failed_replace_leaves_no_temporary_file() -> Result<()> {
        let root = TempDir::new()?;
        let out_dir = root.path().join("20200601");
        fs::create_dir(&out_dir)?;
        // a directory in the way makes the final rename fail
        fs::create_dir(out_dir.join("No_Intervention.csv"))?;
        fs::write(out_dir.join("No_Intervention.csv").join("keep"), b"x")?;
        let table = summarize_state(&sample());

        assert!(save_csv_by_scenario(&table, root.path(), "20200601", None).is_err());
        let leftovers: Vec<_> = fs::read_dir(&out_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
        Ok(())
    }

    #[test]
    fn one_file_per_scenario_without_scenario_column() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir(root.path().join("20200601"))?;
        let table = summarize_state(&sample());

        let paths = save_csv_by_scenario(&table, root.path(), "20200601", None)?;
        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Continued_Lockdown.csv", "No_Intervention.csv"]);

        let text = fs::read_to_string(&paths[1])?;
        let mut lines = text.lines();
        let header: Vec<&str> = lines.next().unwrap().split(',').collect();
        let mut expected = vec!["date".to_string()];
        expected.extend(stat_columns());
        assert_eq!(header, expected);

        let rows: Vec<&str> = lines.collect();
        assert_eq!(rows.len(), 2);
        let first: Vec<&str> = rows[0].split(',').collect();
        assert_eq!(first[0], "2020-06-01");
        let deaths: Vec<f64> = first[21..25].iter().map(|v| v.parse().unwrap()).collect();
        assert_eq!(deaths, vec![20.0, 20.0, 15.0, 25.0]);
        Ok(())
    }

    #[test]
    fn region_reports_carry_geoid_after_date() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir(root.path().join("20200601"))?;
        let table = summarize_region(&sample());

        let paths = save_csv_by_scenario(&table, root.path(), "20200601", Some("county"))?;
        let lockdown = fs::read_to_string(&paths[0])?;
        let mut lines = lockdown.lines();
        assert!(lines.next().unwrap().starts_with("date,geoid,hosp_occup_mean,"));
        let regions: Vec<&str> = lines.map(|l| l.split(',').nth(1).unwrap()).collect();
        assert_eq!(regions, vec!["06001", "06003"]);
        Ok(())
    }

    #[test]
    fn rewriting_is_byte_identical() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir(root.path().join("20200601"))?;
        let records = sample();

        let first = save_csv_by_scenario(&summarize_state(&records), root.path(), "20200601", None)?;
        let before: Vec<Vec<u8>> = first.iter().map(fs::read).collect::<Result<_, _>>()?;
        let second = save_csv_by_scenario(&summarize_state(&records), root.path(), "20200601", None)?;
        let after: Vec<Vec<u8>> = second.iter().map(fs::read).collect::<Result<_, _>>()?;
        assert_eq!(before, after);
        Ok(())
    }

    #[test]
    fn missing_output_directory_is_fatal() -> Result<()> {
        let root = TempDir::new()?;
        let table = summarize_state(&sample());
        let err = save_csv_by_scenario(&table, root.path(), "20200601", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::MissingOutputDir(_))
        ));
        assert!(!root.path().join("20200601").exists());
        Ok(())
    }

    #[test]
    fn empty_table_is_fatal() -> Result<()> {
        let root = TempDir::new()?;
        fs::create_dir(root.path().join("20200601"))?;
        let table = SummaryTable {
            granularity: Granularity::State,
            rows: Vec::new(),
        };
        let err = save_csv_by_scenario(&table, root.path(), "20200601", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoScenarios)
        ));
        Ok(())
    }
}
