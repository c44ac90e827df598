//! Load the dataset once per process and hand out shared references.
//!
//! The loader is constructed explicitly (from config) and its `Arc<Dataset>` is
//! injected into whatever needs it; there is no global cache.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{info, warn};

use crate::data::dataset::Dataset;
use crate::data::error::{DataError, Result};
use crate::data::record::Metric;
use crate::data::table::{read_table, RawTable};

pub const DEFAULT_DATA_DIR: &str = "data";

/// Directory holding the provider's three global time-series files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub dir: PathBuf,
}

impl DataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, metric: Metric) -> PathBuf {
        self.dir.join(metric.file_name())
    }

    /// Read and assemble the dataset from storage. Confirmed is required;
    /// a missing deaths or recovered file leaves those counts empty.
    pub fn read(&self) -> Result<Dataset> {
        let confirmed = read_table(&self.path_for(Metric::Confirmed), Metric::Confirmed)?;
        let deaths = self.read_optional(Metric::Deaths)?;
        let recovered = self.read_optional(Metric::Recovered)?;
        Dataset::from_tables(confirmed, deaths, recovered)
    }

    fn read_optional(&self, metric: Metric) -> Result<Option<RawTable>> {
        let path = self.path_for(metric);
        match read_table(&path, metric) {
            Ok(table) => Ok(Some(table)),
            Err(DataError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), %metric, "metric file not found, counts will be empty");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Memoizing front for [`DataSource::read`].
#[derive(Debug)]
pub struct DatasetLoader {
    source: DataSource,
    cached: OnceLock<Arc<Dataset>>,
    init: Mutex<()>,
}

impl DatasetLoader {
    pub fn new(source: DataSource) -> Self {
        Self {
            source,
            cached: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    /// First successful call reads storage; later calls return the same `Arc`.
    /// A failed read is not cached, so a later call may retry.
    pub fn load(&self) -> Result<Arc<Dataset>> {
        if let Some(dataset) = self.cached.get() {
            return Ok(Arc::clone(dataset));
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(dataset) = self.cached.get() {
            return Ok(Arc::clone(dataset));
        }

        let dataset = Arc::new(self.source.read()?);
        info!(
            dir = %self.source.dir.display(),
            regions = dataset.regions().len(),
            dates = dataset.dates().len(),
            records = dataset.len(),
            first = %dataset.first_date(),
            last = %dataset.last_date(),
            "dataset loaded"
        );
        Ok(Arc::clone(self.cached.get_or_init(|| dataset)))
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::thread;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("covid-explorer-{name}-{stamp}"));
        fs::create_dir_all(&dir).expect("temp dir should be created");
        dir
    }

    fn write_confirmed(dir: &Path) {
        fs::write(
            dir.join(Metric::Confirmed.file_name()),
            "Province/State,Country/Region,Lat,Long,1/1/20,1/2/20,1/3/20\n\
             ,A,0,0,1,2,4\n\
             ,B,0,0,0,1,1\n",
        )
        .expect("fixture should be written");
    }

    #[test]
    fn load_is_memoized_and_does_not_reread_storage() {
        let dir = temp_dir("memo");
        write_confirmed(&dir);
        let loader = DatasetLoader::new(DataSource::new(&dir));
        assert!(!loader.is_loaded());

        let first = loader.load().expect("first load should succeed");
        fs::remove_dir_all(&dir).expect("fixture dir should be removed");
        let second = loader.load().expect("second load should come from memory");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.records(), second.records());
        assert!(loader.is_loaded());
    }

    #[test]
    fn concurrent_first_loads_share_one_dataset() {
        let dir = temp_dir("concurrent");
        write_confirmed(&dir);
        let loader = DatasetLoader::new(DataSource::new(&dir));

        let loaded: Vec<Arc<Dataset>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| loader.load())).collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .expect("loader thread should not panic")
                        .expect("concurrent load should succeed")
                })
                .collect()
        });

        assert_eq!(loaded.len(), 8);
        assert!(loaded.iter().all(|dataset| Arc::ptr_eq(dataset, &loaded[0])));
        assert!(Arc::ptr_eq(&loaded[0], &loader.load().expect("cached load")));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_confirmed_file_is_unavailable() {
        let dir = temp_dir("missing");
        let loader = DatasetLoader::new(DataSource::new(&dir));
        let err = loader.load().unwrap_err();
        assert!(matches!(err, DataError::Read { .. }), "got {err:?}");
        assert!(!loader.is_loaded());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn failed_load_can_be_retried() {
        let dir = temp_dir("retry");
        let loader = DatasetLoader::new(DataSource::new(&dir));
        assert!(loader.load().is_err());
        write_confirmed(&dir);
        assert_eq!(loader.load().expect("retry should succeed").regions().len(), 2);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_secondary_files_are_tolerated() {
        let dir = temp_dir("secondary");
        write_confirmed(&dir);
        let dataset = DataSource::new(&dir).read().expect("confirmed alone is enough");
        assert_eq!(dataset.metrics(), [Metric::Confirmed]);
        assert!(dataset.records().iter().all(|r| r.deaths.is_none() && r.recovered.is_none()));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn malformed_secondary_file_is_fatal() {
        let dir = temp_dir("bad-secondary");
        write_confirmed(&dir);
        fs::write(dir.join(Metric::Deaths.file_name()), "Country,Date,Deaths\nA,1/1/20,0\n")
            .expect("fixture should be written");
        let err = DataSource::new(&dir).read().unwrap_err();
        assert!(matches!(err, DataError::Schema { .. }), "got {err:?}");
        let _ = fs::remove_dir_all(dir);
    }
}
