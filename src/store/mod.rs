//! Warehouse access.
//!
//! Writes go through [`RunStore`] and [`ObservationSink`]: one transaction per
//! ingestion run, one merge-by-natural-key statement per observation, one
//! commit at the end. Reads are plain paginated queries on [`WeatherStore`].

pub mod sqlite;

pub use sqlite::{RunTransaction, WeatherStore};

use crate::error::Result;
use crate::models::MergeRow;

/// A store that can open the single unit of work backing an ingestion run.
pub trait RunStore {
    type Batch<'a>: ObservationSink
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Batch<'_>>;
}

/// Receives merges for one run. Dropping it without `commit` discards every merge.
pub trait ObservationSink {
    /// Insert the row for `(station_id, date)`, or overwrite the existing one.
    fn merge(&mut self, row: &MergeRow<'_>) -> Result<()>;

    fn commit(self) -> Result<()>
    where
        Self: Sized;
}

impl<T: RunStore> RunStore for &mut T {
    type Batch<'a> = T::Batch<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Batch<'_>> {
        (**self).begin()
    }
}
