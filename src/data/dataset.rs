//! In-memory case dataset: region-level records plus the location-level tables
//! they were aggregated from. Immutable once built; share it through an `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::warn;

use crate::data::error::{DataError, Result};
use crate::data::record::{CaseRecord, Metric};
use crate::data::table::RawTable;

#[derive(Debug, Clone)]
pub struct Dataset {
    /// Ordered by date, then region.
    records: Vec<CaseRecord>,
    dates: Vec<NaiveDate>,
    regions: Vec<String>,
    /// Region -> indices into `records`, in date order.
    by_region: HashMap<String, Vec<usize>>,
    metrics: Vec<Metric>,
    tables: BTreeMap<Metric, RawTable>,
}

impl Dataset {
    /// Build from parsed provider tables. Sub-territories are summed per region;
    /// deaths and recovered are joined onto confirmed by (region, date). Regions
    /// reported only in a secondary table are kept with zero confirmed cases.
    pub fn from_tables(
        confirmed: RawTable,
        deaths: Option<RawTable>,
        recovered: Option<RawTable>,
    ) -> Result<Self> {
        let mut confirmed_by_region = sum_by_region(&confirmed);
        let deaths_lookup = deaths.as_ref().map(SecondaryLookup::new);
        let recovered_lookup = recovered.as_ref().map(SecondaryLookup::new);

        let secondary_only: BTreeSet<&String> = deaths_lookup
            .iter()
            .chain(recovered_lookup.iter())
            .flat_map(|lookup| lookup.by_region.keys())
            .filter(|region| !confirmed_by_region.contains_key(*region))
            .collect();
        if !secondary_only.is_empty() {
            warn!(
                regions = ?secondary_only,
                "regions missing from the confirmed table, counting zero confirmed cases"
            );
            for region in secondary_only {
                confirmed_by_region.insert(region.clone(), vec![0; confirmed.dates.len()]);
            }
        }

        let mut records = Vec::with_capacity(confirmed.dates.len() * confirmed_by_region.len());
        for (date_idx, date) in confirmed.dates.iter().enumerate() {
            for (region, counts) in &confirmed_by_region {
                records.push(CaseRecord {
                    region: region.clone(),
                    date: *date,
                    confirmed: counts[date_idx],
                    recovered: recovered_lookup.as_ref().and_then(|l| l.get(region, date)),
                    deaths: deaths_lookup.as_ref().and_then(|l| l.get(region, date)),
                });
            }
        }

        let mut tables = BTreeMap::new();
        tables.insert(Metric::Confirmed, confirmed);
        if let Some(table) = deaths {
            tables.insert(Metric::Deaths, table);
        }
        if let Some(table) = recovered {
            tables.insert(Metric::Recovered, table);
        }

        Self::assemble(records, tables)
    }

    /// Build from already-aggregated records (any order). Duplicate
    /// (region, date) pairs keep the first occurrence.
    pub fn from_records(mut records: Vec<CaseRecord>) -> Result<Self> {
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.region.cmp(&b.region)));
        let before = records.len();
        records.dedup_by(|later, earlier| later.date == earlier.date && later.region == earlier.region);
        if records.len() != before {
            warn!(dropped = before - records.len(), "dropped duplicate (region, date) records");
        }
        Self::assemble(records, BTreeMap::new())
    }

    fn assemble(records: Vec<CaseRecord>, tables: BTreeMap<Metric, RawTable>) -> Result<Self> {
        if records.is_empty() {
            return Err(DataError::Empty {
                path: PathBuf::from("<dataset>"),
            });
        }

        let mut dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        dates.dedup();

        let mut by_region: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_region.entry(record.region.clone()).or_default().push(idx);
        }
        let mut regions: Vec<String> = by_region.keys().cloned().collect();
        regions.sort();

        let metrics = Metric::ALL
            .into_iter()
            .filter(|metric| {
                tables.contains_key(metric) || records.iter().any(|r| r.count(*metric).is_some())
            })
            .collect();

        Ok(Self {
            records,
            dates,
            regions,
            by_region,
            metrics,
            tables,
        })
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false for a constructed dataset; kept for the `len` convention.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Observed dates, ascending and unique.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Region names, sorted.
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn contains_region(&self, region: &str) -> bool {
        self.by_region.contains_key(region)
    }

    /// Records for one region in date order; empty for unknown regions.
    pub fn region_records<'a>(&'a self, region: &str) -> impl Iterator<Item = &'a CaseRecord> + 'a {
        self.by_region
            .get(region)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(move |idx| &self.records[*idx])
    }

    /// Metrics with at least some data loaded.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    /// Location-level source table, when the dataset was built from files.
    pub fn table(&self, metric: Metric) -> Option<&RawTable> {
        self.tables.get(&metric)
    }
}

fn sum_by_region(table: &RawTable) -> BTreeMap<String, Vec<u64>> {
    let mut sums: BTreeMap<String, Vec<u64>> = BTreeMap::new();
    for row in &table.rows {
        let entry = sums
            .entry(row.region.clone())
            .or_insert_with(|| vec![0; table.dates.len()]);
        for (total, count) in entry.iter_mut().zip(&row.counts) {
            *total = total.saturating_add(*count);
        }
    }
    sums
}

struct SecondaryLookup {
    date_index: HashMap<NaiveDate, usize>,
    by_region: BTreeMap<String, Vec<u64>>,
}

impl SecondaryLookup {
    fn new(table: &RawTable) -> Self {
        Self {
            date_index: table.dates.iter().enumerate().map(|(idx, d)| (*d, idx)).collect(),
            by_region: sum_by_region(table),
        }
    }

    fn get(&self, region: &str, date: &NaiveDate) -> Option<u64> {
        let idx = *self.date_index.get(date)?;
        self.by_region.get(region).map(|counts| counts[idx])
    }
}
