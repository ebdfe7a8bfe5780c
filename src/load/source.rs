// src/load/source.rs
use anyhow::{Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::{cast, cast_with_options, CastOptions},
    csv::{reader::Format, ReaderBuilder},
    datatypes::{DataType, Date32Type, Field, Float64Type, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::File,
    io::{Seek, SeekFrom},
    path::Path,
    sync::Arc,
};
use tracing::{debug, instrument};

use super::region::RegionFilter;
use crate::error::PipelineError;
use crate::records::{Metric, Metrics, RawRecord};

/// Region identifier column in simulator output.
pub const REGION_COLUMN: &str = "geoid";
/// Date column in simulator output.
pub const DATE_COLUMN: &str = "time";

const BATCH_SIZE: usize = 8192;

/// Tabular encodings we know how to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    Csv,
}

impl SourceFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Parquet => ".parquet",
            SourceFormat::Csv => ".csv",
        }
    }

    /// Detect the format from a file name; returns it with the name minus
    /// its extension.
    pub fn split_file_name(name: &str) -> Option<(Self, &str)> {
        [SourceFormat::Parquet, SourceFormat::Csv]
            .into_iter()
            .find_map(|fmt| name.strip_suffix(fmt.extension()).map(|stem| (fmt, stem)))
    }
}

/// Read every row of `path`, keeping the ones whose region passes `filter`.
#[instrument(level = "debug", skip(path, filter), fields(path = %path.display()))]
pub fn read_records(path: &Path, filter: &RegionFilter) -> Result<Vec<RawRecord>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let batches = match SourceFormat::split_file_name(name) {
        Some((SourceFormat::Parquet, _)) => read_parquet(path)?,
        Some((SourceFormat::Csv, _)) => read_csv(path)?,
        None => anyhow::bail!("unsupported source file {}", path.display()),
    };

    let mut out = Vec::new();
    let mut undated = 0usize;
    for batch in &batches {
        undated += records_from_batch(batch, path, filter, &mut out)?;
    }
    if undated > 0 {
        debug!(undated, "skipped rows without a date");
    }
    debug!(rows = out.len(), "loaded");
    Ok(out)
}

fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("failed to read parquet metadata of `{}`", path.display()))?
        .with_batch_size(BATCH_SIZE)
        .build()
        .with_context(|| format!("failed to build batch reader for `{}`", path.display()))?;
    reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("error reading batches from `{}`", path.display()))
}

/// Region and date stay text so identifiers keep their leading zeros;
/// metric columns are parsed as floats.
fn read_csv(path: &Path) -> Result<Vec<RecordBatch>> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let (header, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(1))
        .with_context(|| format!("failed to read CSV header of `{}`", path.display()))?;
    file.seek(SeekFrom::Start(0))?;

    let fields: Vec<Field> = header
        .fields()
        .iter()
        .map(|f| {
            let ty = match Metric::from_raw(f.name()) {
                Some(_) => DataType::Float64,
                None => DataType::Utf8,
            };
            Field::new(f.name(), ty, true)
        })
        .collect();

    let reader = ReaderBuilder::new(Arc::new(Schema::new(fields)))
        .with_header(true)
        .with_batch_size(BATCH_SIZE)
        .build(file)
        .context("creating CSV reader")?;
    reader
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("CSV parse error in `{}`", path.display()))
}

fn column<'a>(batch: &'a RecordBatch, path: &Path, name: &str) -> Result<&'a ArrayRef> {
    batch.column_by_name(name).ok_or_else(|| {
        PipelineError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        }
        .into()
    })
}

/// Append the matching rows of `batch` to `out`. Returns how many rows
/// passed the region filter but had no usable date.
fn records_from_batch(
    batch: &RecordBatch,
    path: &Path,
    filter: &RegionFilter,
    out: &mut Vec<RawRecord>,
) -> Result<usize> {
    let regions = cast(column(batch, path, REGION_COLUMN)?, &DataType::Utf8)?;
    let regions = regions.as_string::<i32>();
    // a malformed date fails the file instead of turning into a null
    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };
    let dates = cast_with_options(
        column(batch, path, DATE_COLUMN)?,
        &DataType::Date32,
        &strict,
    )
    .with_context(|| format!("bad `{}` value in `{}`", DATE_COLUMN, path.display()))?;
    let dates = dates.as_primitive::<Date32Type>();

    let metric_arrays = Metric::ALL
        .iter()
        .map(|m| -> Result<ArrayRef> {
            Ok(cast(column(batch, path, m.raw_name())?, &DataType::Float64)?)
        })
        .collect::<Result<Vec<_>>>()?;
    let metric_values: Vec<_> = metric_arrays
        .iter()
        .map(|a| a.as_primitive::<Float64Type>())
        .collect();

    let mut undated = 0;
    for row in 0..batch.num_rows() {
        if regions.is_null(row) || !filter.matches(regions.value(row)) {
            continue;
        }
        let date = match dates.is_valid(row).then(|| dates.value_as_date(row)).flatten() {
            Some(d) => d,
            None => {
                undated += 1;
                continue;
            }
        };

        // nulls contribute nothing to the per-run sums
        let mut metrics = Metrics::default();
        for (metric, values) in Metric::ALL.iter().zip(&metric_values) {
            if values.is_valid(row) {
                metrics.set(*metric, values.value(row));
            }
        }

        out.push(RawRecord {
            region_id: regions.value(row).to_string(),
            date,
            metrics,
        });
    }
    Ok(undated)
}
