//! Case dataset: CSV ingestion, the memoized in-memory dataset, filter queries
//! and the derived views served by the API.

pub mod dataset;
pub mod error;
pub mod loader;
pub mod query;
pub mod record;
pub mod table;
pub mod views;

pub use dataset::Dataset;
pub use error::DataError;
pub use loader::{DataSource, DatasetLoader};
pub use query::{filter, DailyTotal, DateRange, FilterQuery, Projection, RegionSelection};
pub use record::{CaseRecord, Metric};
