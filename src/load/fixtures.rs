//! Small source files for loader tests.

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use std::{fmt::Write as _, fs::File, path::Path, sync::Arc};

use super::source::{DATE_COLUMN, REGION_COLUMN};
use crate::records::{days_since_epoch, Metric};

pub struct FixtureRow {
    pub geoid: String,
    pub time: NaiveDate,
    pub values: [f64; 6],
}

impl FixtureRow {
    /// Every metric set to `value`.
    pub fn new(geoid: &str, time: NaiveDate, value: f64) -> Self {
        Self {
            geoid: geoid.to_string(),
            time,
            values: [value; 6],
        }
    }
}

pub fn write_parquet(path: &Path, rows: &[FixtureRow]) -> Result<()> {
    let mut fields = vec![
        Field::new(REGION_COLUMN, DataType::Utf8, false),
        Field::new(DATE_COLUMN, DataType::Date32, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.geoid.as_str()),
        )),
        Arc::new(Date32Array::from(
            rows.iter()
                .map(|r| days_since_epoch(r.time))
                .collect::<Vec<_>>(),
        )),
    ];
    for metric in Metric::ALL {
        fields.push(Field::new(metric.raw_name(), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter()
                .map(|r| r.values[metric.index()])
                .collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building fixture batch")?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

pub fn write_csv(path: &Path, rows: &[FixtureRow]) -> Result<()> {
    let mut text = format!("{},{}", REGION_COLUMN, DATE_COLUMN);
    for metric in Metric::ALL {
        write!(text, ",{}", metric.raw_name())?;
    }
    text.push('\n');
    for row in rows {
        write!(text, "{},{}", row.geoid, row.time.format("%Y-%m-%d"))?;
        for v in row.values {
            write!(text, ",{}", v)?;
        }
        text.push('\n');
    }
    std::fs::write(path, text)?;
    Ok(())
}
