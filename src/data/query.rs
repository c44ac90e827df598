//! Filter queries over a loaded [`Dataset`].
//!
//! Queries never fail. Date bounds outside the observed range are clamped,
//! reversed bounds are swapped, and a range that misses the data entirely
//! produces an empty projection.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::dataset::Dataset;
use crate::data::record::CaseRecord;

/// Which regions a query covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegionSelection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl RegionSelection {
    pub fn one(region: impl Into<String>) -> Self {
        Self::Only(BTreeSet::from([region.into()]))
    }

    pub fn matches(&self, region: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(regions) => regions.contains(region),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for RegionSelection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::Only(iter.into_iter().map(Into::into).collect())
    }
}

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterQuery {
    pub regions: RegionSelection,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl FilterQuery {
    pub fn region(region: impl Into<String>) -> Self {
        Self {
            regions: RegionSelection::one(region),
            ..Self::default()
        }
    }

    pub fn between(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn since(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn until(mut self, end: NaiveDate) -> Self {
        self.end = Some(end);
        self
    }

    /// Resolve the requested bounds against the observed range `[first, last]`.
    /// Returns `None` when the request lies entirely outside it.
    pub fn effective_range(&self, first: NaiveDate, last: NaiveDate) -> Option<DateRange> {
        let (start, end) = match (self.start, self.end) {
            (Some(s), Some(e)) if s > e => (Some(e), Some(s)),
            bounds => bounds,
        };
        if start.is_some_and(|s| s > last) || end.is_some_and(|e| e < first) {
            return None;
        }
        Some(DateRange {
            start: start.map_or(first, |s| s.max(first)),
            end: end.map_or(last, |e| e.min(last)),
        })
    }
}

/// Per-date sum over the regions of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub confirmed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deaths: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered: Option<u64>,
    pub regions: usize,
}

/// Records selected by one query, ordered by date then region.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Projection {
    /// Clamped range actually applied; `None` when the request missed the data.
    pub range: Option<DateRange>,
    pub records: Vec<CaseRecord>,
}

impl Projection {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// `(date, confirmed)` pairs, the shape a single-region chart needs.
    pub fn confirmed_points(&self) -> Vec<(NaiveDate, u64)> {
        self.records.iter().map(|r| (r.date, r.confirmed)).collect()
    }

    /// Sum the selected regions per date. A secondary total is present only
    /// if some region reported it on that date.
    pub fn daily_totals(&self) -> Vec<DailyTotal> {
        let mut totals: BTreeMap<NaiveDate, DailyTotal> = BTreeMap::new();
        for record in &self.records {
            let total = totals.entry(record.date).or_insert_with(|| DailyTotal {
                date: record.date,
                confirmed: 0,
                deaths: None,
                recovered: None,
                regions: 0,
            });
            total.confirmed = total.confirmed.saturating_add(record.confirmed);
            total.regions += 1;
            if let Some(deaths) = record.deaths {
                let sum = total.deaths.get_or_insert(0);
                *sum = sum.saturating_add(deaths);
            }
            if let Some(recovered) = record.recovered {
                let sum = total.recovered.get_or_insert(0);
                *sum = sum.saturating_add(recovered);
            }
        }
        totals.into_values().collect()
    }
}

/// Select the records matching `query`. Never fails; see module docs for
/// how out-of-range and reversed bounds are handled.
pub fn filter(dataset: &Dataset, query: &FilterQuery) -> Projection {
    let Some(range) = query.effective_range(dataset.first_date(), dataset.last_date()) else {
        return Projection::default();
    };

    let records = match &query.regions {
        RegionSelection::All => dataset
            .records()
            .iter()
            .filter(|r| range.contains(r.date))
            .cloned()
            .collect(),
        RegionSelection::Only(regions) => {
            let mut selected: Vec<CaseRecord> = regions
                .iter()
                .flat_map(|region| dataset.region_records(region))
                .filter(|r| range.contains(r.date))
                .cloned()
                .collect();
            selected.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.region.cmp(&b.region)));
            selected
        }
    };

    Projection {
        range: Some(range),
        records,
    }
}
