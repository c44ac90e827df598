//! Typed case records and the metric selector shared by loader, views and API.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Cumulative counts for one region on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub region: String,
    pub date: NaiveDate,
    pub confirmed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u64>,
}

impl CaseRecord {
    pub fn new(region: impl Into<String>, date: NaiveDate, confirmed: u64) -> Self {
        Self {
            region: region.into(),
            date,
            confirmed,
            recovered: None,
            deaths: None,
        }
    }

    /// Confirmed cases neither recovered nor dead. Needs both secondary counts.
    /// Signed: upstream corrections can push it below zero.
    pub fn active(&self) -> Option<i64> {
        let deaths = self.deaths?;
        let recovered = self.recovered?;
        Some(active_cases(self.confirmed, deaths, recovered))
    }

    pub fn count(&self, metric: Metric) -> Option<u64> {
        match metric {
            Metric::Confirmed => Some(self.confirmed),
            Metric::Deaths => self.deaths,
            Metric::Recovered => self.recovered,
        }
    }
}

/// `confirmed - deaths - recovered`, saturating at the `i64` bounds.
pub fn active_cases(confirmed: u64, deaths: u64, recovered: u64) -> i64 {
    let active = i128::from(confirmed) - i128::from(deaths) - i128::from(recovered);
    i64::try_from(active).unwrap_or(if active > 0 { i64::MAX } else { i64::MIN })
}

/// One of the three cumulative series published by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Confirmed,
    Deaths,
    Recovered,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Confirmed, Metric::Deaths, Metric::Recovered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Deaths => "deaths",
            Self::Recovered => "recovered",
        }
    }

    /// Heading used by the raw data view.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed Cases",
            Self::Deaths => "COVID-19 Related Deaths",
            Self::Recovered => "Recovered Cases",
        }
    }

    /// Upstream file name inside the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Confirmed => "time_series_covid19_confirmed_global.csv",
            Self::Deaths => "time_series_covid19_deaths_global.csv",
            Self::Recovered => "time_series_covid19_recovered_global.csv",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMetric(pub String);

impl fmt::Display for UnknownMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown metric '{}', expected one of: confirmed, deaths, recovered",
            self.0
        )
    }
}

impl std::error::Error for UnknownMetric {}

impl FromStr for Metric {
    type Err = UnknownMetric;

    /// Accepts the short names plus the selector labels shown in the UI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" | "confirmed cases" => Ok(Self::Confirmed),
            "deaths" | "death" | "covid-19 related deaths" => Ok(Self::Deaths),
            "recovered" | "recovered cases" => Ok(Self::Recovered),
            _ => Err(UnknownMetric(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn active_requires_both_secondary_counts() {
        let mut rec = CaseRecord::new("Germany", day(1), 100);
        assert_eq!(rec.active(), None);
        rec.deaths = Some(5);
        assert_eq!(rec.active(), None);
        rec.recovered = Some(20);
        assert_eq!(rec.active(), Some(75));
    }

    #[test]
    fn active_can_go_negative_on_bad_upstream_data() {
        let rec = CaseRecord {
            deaths: Some(3),
            recovered: Some(10),
            ..CaseRecord::new("X", day(2), 8)
        };
        assert_eq!(rec.active(), Some(-5));
    }

    #[test]
    fn active_saturates_instead_of_wrapping() {
        assert_eq!(active_cases(u64::MAX, 0, 0), i64::MAX);
        assert_eq!(active_cases(0, u64::MAX, u64::MAX), i64::MIN);
        assert_eq!(active_cases(i64::MAX as u64, 1, 1), i64::MAX - 2);
    }

    #[test]
    fn metric_parses_ui_labels() {
        assert_eq!("Confirmed Cases".parse::<Metric>(), Ok(Metric::Confirmed));
        assert_eq!("COVID-19 Related Deaths".parse::<Metric>(), Ok(Metric::Deaths));
        assert_eq!(" RECOVERED ".parse::<Metric>(), Ok(Metric::Recovered));
        assert!("hospitalized".parse::<Metric>().is_err());
    }
}
