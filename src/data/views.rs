//! Derived projections behind the explorer's views: world totals, a region's
//! series with active cases, map points for one day, and raw region tables.

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::dataset::Dataset;
use crate::data::query::{filter, DateRange, FilterQuery, RegionSelection};
use crate::data::record::{active_cases, Metric};

/// Region preselected in the region view when it exists.
pub const PREFERRED_REGION: &str = "Germany";

/// World totals on the last observed date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub last_updated: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub active: i64,
}

pub fn summary(dataset: &Dataset) -> Summary {
    let last = dataset.last_date();
    let mut totals = Summary {
        last_updated: last,
        confirmed: 0,
        deaths: 0,
        recovered: 0,
        active: 0,
    };
    for record in dataset.records().iter().filter(|r| r.date == last) {
        totals.confirmed = totals.confirmed.saturating_add(record.confirmed);
        totals.deaths = totals.deaths.saturating_add(record.deaths.unwrap_or(0));
        totals.recovered = totals.recovered.saturating_add(record.recovered.unwrap_or(0));
    }
    totals.active = active_cases(totals.confirmed, totals.deaths, totals.recovered);
    totals
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: Option<u64>,
    pub recovered: Option<u64>,
    pub confirmed_active: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionSeries {
    pub region: String,
    pub range: Option<DateRange>,
    pub points: Vec<SeriesPoint>,
}

pub fn region_series(dataset: &Dataset, region: &str, query: &FilterQuery) -> RegionSeries {
    let query = FilterQuery {
        regions: RegionSelection::one(region),
        ..query.clone()
    };
    let projection = filter(dataset, &query);
    RegionSeries {
        region: region.to_string(),
        range: projection.range,
        points: projection
            .records
            .iter()
            .map(|r| SeriesPoint {
                date: r.date,
                confirmed: r.confirmed,
                deaths: r.deaths,
                recovered: r.recovered,
                confirmed_active: r.active(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub lat: f64,
    pub long: f64,
    pub value: u64,
    /// `value` with thousands separators, for tooltips.
    pub value_string: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub metric: Metric,
    /// Index into the observed dates actually shown.
    pub day: usize,
    pub days: usize,
    pub date: NaiveDate,
    pub points: Vec<MapPoint>,
}

/// Location-level values of `metric` on observed day `day` (0-based). `None`
/// or an index past the end selects the last day. Rows without coordinates are
/// skipped; a metric whose table was not loaded yields no points.
pub fn map_points(dataset: &Dataset, metric: Metric, day: Option<usize>) -> MapView {
    let days = dataset.dates().len();
    let day = day.map_or(days - 1, |d| d.min(days - 1));
    let date = dataset.dates()[day];

    let points = dataset
        .table(metric)
        .and_then(|table| {
            let column = table.dates.binary_search(&date).ok()?;
            Some(
                table
                    .rows
                    .iter()
                    .filter_map(|row| {
                        let value = row.counts[column];
                        Some(MapPoint {
                            region: row.region.clone(),
                            province: row.province.clone(),
                            lat: row.lat?,
                            long: row.long?,
                            value,
                            value_string: thousands(value),
                        })
                    })
                    .collect(),
            )
        })
        .unwrap_or_default();

    MapView {
        metric,
        day,
        days,
        date,
        points,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    pub region: String,
    pub values: Vec<Option<u64>>,
}

/// Region x date matrix for one metric, rows sorted by region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricTable {
    pub metric: Metric,
    pub title: &'static str,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<TableRow>,
}

pub fn metric_table(dataset: &Dataset, metric: Metric) -> MetricTable {
    let rows = dataset
        .regions()
        .iter()
        .map(|region| {
            let mut records = dataset.region_records(region).peekable();
            let values = dataset
                .dates()
                .iter()
                .map(|date| match records.peek() {
                    Some(record) if record.date == *date => {
                        records.next().and_then(|r| r.count(metric))
                    }
                    _ => None,
                })
                .collect();
            TableRow {
                region: region.clone(),
                values,
            }
        })
        .collect();
    MetricTable {
        metric,
        title: metric.title(),
        dates: dataset.dates().to_vec(),
        rows,
    }
}

pub fn default_region(dataset: &Dataset) -> &str {
    if dataset.contains_region(PREFERRED_REGION) {
        PREFERRED_REGION
    } else {
        &dataset.regions()[0]
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
