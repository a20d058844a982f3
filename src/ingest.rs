//! Weather-station record ingestion.
//!
//! One record per line, whitespace separated:
//!
//! ```text
//! LOCATION YEAR MONTH DAY TIME VALUE
//! BOURNE   2013 1     1   0    -0.3
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("line {line}: expected 6 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid {field} {value:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: {year}-{month}-{day} is not a calendar date")]
    InvalidDate {
        line: usize,
        year: i32,
        month: u32,
        day: u32,
    },

    #[error("line {line}: value {value} is not finite")]
    NonFinite { line: usize, value: f32 },
}

/// One temperature reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub location: String,
    pub date: NaiveDate,
    /// Time of day as HHMM.
    pub time: u16,
    pub value: f32,
}

fn field<T: std::str::FromStr>(
    raw: &str,
    line: usize,
    name: &'static str,
) -> Result<T, IngestError> {
    raw.parse().map_err(|_| IngestError::InvalidField {
        line,
        field: name,
        value: raw.to_string(),
    })
}

/// Parse one line. Blank lines yield `None`. `line` is 1-based.
pub fn parse_line(text: &str, line: usize) -> Result<Option<Record>, IngestError> {
    let fields: Vec<&str> = text.split_whitespace().collect();
    if fields.is_empty() {
        return Ok(None);
    }
    if fields.len() != 6 {
        return Err(IngestError::FieldCount {
            line,
            found: fields.len(),
        });
    }

    let year: i32 = field(fields[1], line, "year")?;
    let month: u32 = field(fields[2], line, "month")?;
    let day: u32 = field(fields[3], line, "day")?;
    let time: u16 = field(fields[4], line, "time")?;
    let value: f32 = field(fields[5], line, "value")?;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or(IngestError::InvalidDate {
        line,
        year,
        month,
        day,
    })?;
    if !value.is_finite() {
        return Err(IngestError::NonFinite { line, value });
    }

    Ok(Some(Record {
        location: fields[0].to_string(),
        date,
        time,
        value,
    }))
}

pub fn parse_records(content: &str) -> Result<Vec<Record>, IngestError> {
    let mut records = Vec::new();
    for (i, text) in content.lines().enumerate() {
        if let Some(record) = parse_line(text, i + 1)? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Read and parse a record file.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file: {}", path.display()))?;
    let records = parse_records(&content)
        .with_context(|| format!("failed to parse data file: {}", path.display()))?;
    info!(path = %path.display(), records = records.len(), "loaded records");
    Ok(records)
}

/// The value column, in file order.
pub fn values(records: &[Record]) -> Vec<f32> {
    records.iter().map(|r| r.value).collect()
}
