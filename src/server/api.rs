//! JSON payloads for the explorer API. Pure functions over a loaded dataset so
//! they can be exercised without a running server.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::query::{filter, DailyTotal, DateRange, FilterQuery, RegionSelection};
use crate::data::record::{CaseRecord, Metric, UnknownMetric};
use crate::data::views::{self, MapView, MetricTable, RegionSeries, Summary};
use crate::data::Dataset;

const QUERY_DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%y"];

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

pub fn health_payload() -> HealthResponse {
    HealthResponse {
        status: "ok",
        service: "covid-explorer",
        version: env!("CARGO_PKG_VERSION"),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionsResponse {
    pub status: &'static str,
    pub regions: Vec<String>,
    pub default_region: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub days: usize,
    pub metrics: Vec<Metric>,
}

pub fn regions_payload(dataset: &Dataset) -> RegionsResponse {
    RegionsResponse {
        status: "ok",
        regions: dataset.regions().to_vec(),
        default_region: views::default_region(dataset).to_string(),
        first_date: dataset.first_date(),
        last_date: dataset.last_date(),
        days: dataset.dates().len(),
        metrics: dataset.metrics().to_vec(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub summary: Summary,
}

pub fn summary_payload(dataset: &Dataset) -> SummaryResponse {
    SummaryResponse {
        status: "ok",
        summary: views::summary(dataset),
    }
}

/// Parsed `/api/series` query string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeriesParams {
    pub query: FilterQuery,
    /// Sum the selected regions per date instead of listing records.
    pub aggregate: bool,
}

/// Repeated `region` keys select several regions; none selects all.
/// Unparseable dates are treated as open bounds.
pub fn parse_series_params(pairs: &[(String, String)]) -> SeriesParams {
    let mut regions = Vec::new();
    let mut params = SeriesParams::default();
    for (key, value) in pairs {
        match key.as_str() {
            "region" => regions.push(value.trim().to_string()),
            "start" => params.query.start = parse_query_date(key, value),
            "end" => params.query.end = parse_query_date(key, value),
            "aggregate" => params.aggregate = value.eq_ignore_ascii_case("total"),
            _ => debug!(key = %key, "ignoring unknown series parameter"),
        }
    }
    if !regions.is_empty() {
        params.query.regions = regions.into_iter().collect::<RegionSelection>();
    }
    params
}

fn parse_query_date(key: &str, raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = QUERY_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok());
    if parsed.is_none() {
        debug!(key, value = raw, "unparseable date treated as open bound");
    }
    parsed
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesResponse {
    pub status: &'static str,
    pub range: Option<DateRange>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<CaseRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Vec<DailyTotal>>,
}

pub fn series_payload(dataset: &Dataset, params: &SeriesParams) -> SeriesResponse {
    let projection = filter(dataset, &params.query);
    if params.aggregate {
        let totals = projection.daily_totals();
        SeriesResponse {
            status: "ok",
            range: projection.range,
            count: totals.len(),
            records: None,
            totals: Some(totals),
        }
    } else {
        SeriesResponse {
            status: "ok",
            range: projection.range,
            count: projection.len(),
            records: Some(projection.records),
            totals: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionSeriesResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub series: RegionSeries,
}

pub fn region_series_payload(
    dataset: &Dataset,
    region: &str,
    params: &SeriesParams,
) -> RegionSeriesResponse {
    RegionSeriesResponse {
        status: "ok",
        series: views::region_series(dataset, region, &params.query),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapParams {
    pub metric: Option<String>,
    pub day: Option<String>,
}

/// Missing metric means confirmed; a non-numeric day means the last day.
pub fn map_payload(dataset: &Dataset, params: &MapParams) -> Result<MapView, UnknownMetric> {
    let metric = match params.metric.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw.parse()?,
        _ => Metric::Confirmed,
    };
    let day = params.day.as_deref().and_then(|raw| raw.trim().parse::<usize>().ok());
    Ok(views::map_points(dataset, metric, day))
}

pub fn table_payload(dataset: &Dataset, metric: &str) -> Result<MetricTable, UnknownMetric> {
    Ok(views::metric_table(dataset, metric.parse()?))
}
