//! Reader for the provider's wide time-series CSV layout.
//!
//! One file per metric. Header: `Province/State,Country/Region,Lat,Long`
//! followed by one `M/D/YY` column per day; one row per location.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::data::error::{DataError, Result};
use crate::data::record::Metric;

/// Leading non-date columns, in order.
pub const LOCATION_COLUMNS: [&str; 4] = ["Province/State", "Country/Region", "Lat", "Long"];

const DATE_FORMAT: &str = "%m/%d/%y";

/// One source row: a province/state (or whole country) with its series.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRow {
    pub province: Option<String>,
    pub region: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    /// Aligned with [`RawTable::dates`].
    pub counts: Vec<u64>,
}

/// A parsed metric file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub metric: Metric,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<LocationRow>,
}

pub fn read_table(path: &Path, metric: Metric) -> Result<RawTable> {
    let file = File::open(path).map_err(|source| DataError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_table(file, path, metric)
}

/// Parse a metric table from any reader. `origin` is only used in errors and logs.
pub fn parse_table<R: Read>(reader: R, origin: &Path, metric: Metric) -> Result<RawTable> {
    let csv_err = |source| DataError::Csv {
        path: origin.to_path_buf(),
        source,
    };
    let schema_err = |reason: String| DataError::Schema {
        path: origin.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(csv_err)?.clone();
    for (idx, expected) in LOCATION_COLUMNS.iter().enumerate() {
        match headers.get(idx) {
            Some(found) if found.eq_ignore_ascii_case(expected) => {}
            Some(found) => {
                return Err(schema_err(format!(
                    "column {} should be '{expected}', found '{found}'",
                    idx + 1
                )))
            }
            None => return Err(schema_err(format!("missing column '{expected}'"))),
        }
    }

    let date_headers: Vec<&str> = headers.iter().skip(LOCATION_COLUMNS.len()).collect();
    if date_headers.is_empty() {
        return Err(schema_err("no date columns".to_string()));
    }
    let mut dates = Vec::with_capacity(date_headers.len());
    for raw in &date_headers {
        let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
            .map_err(|err| schema_err(format!("column '{raw}' is not a M/D/YY date: {err}")))?;
        if dates.last().is_some_and(|prev| *prev >= date) {
            return Err(schema_err(format!("date column '{raw}' is out of order")));
        }
        dates.push(date);
    }

    let mut rows = Vec::new();
    let mut negative_cells = 0_usize;
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map_or(0, |pos| pos.line());

        let region = record.get(1).unwrap_or("").to_string();
        if region.is_empty() {
            return Err(schema_err(format!("line {line}: blank Country/Region")));
        }
        let province = record
            .get(0)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let mut counts = Vec::with_capacity(dates.len());
        for (offset, raw) in record.iter().skip(LOCATION_COLUMNS.len()).enumerate() {
            let value = parse_count(raw).ok_or_else(|| DataError::InvalidCount {
                path: origin.to_path_buf(),
                line,
                column: date_headers[offset].to_string(),
                value: raw.to_string(),
            })?;
            if value < 0 {
                negative_cells += 1;
            }
            counts.push(value.max(0) as u64);
        }

        rows.push(LocationRow {
            province,
            region,
            lat: parse_coordinate(record.get(2)),
            long: parse_coordinate(record.get(3)),
            counts,
        });
    }

    if rows.is_empty() {
        return Err(DataError::Empty {
            path: origin.to_path_buf(),
        });
    }
    if negative_cells > 0 {
        warn!(
            path = %origin.display(),
            %metric,
            negative_cells,
            "clamped negative counts to zero"
        );
    }
    debug!(
        path = %origin.display(),
        %metric,
        rows = rows.len(),
        dates = dates.len(),
        "parsed metric table"
    );

    Ok(RawTable {
        metric,
        dates,
        rows,
    })
}

/// Blank cells count as zero, like a summed dataframe column.
fn parse_count(raw: &str) -> Option<i64> {
    if raw.is_empty() {
        return Some(0);
    }
    raw.parse::<i64>().ok()
}

fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
}
