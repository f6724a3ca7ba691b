use crate::error::Result;
use crate::models::{DailyObservation, YearlyStat};
use crate::query::pagination::{Page, PageRequest};
use crate::store::WeatherStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyFilter {
    pub station_id: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyFilter {
    pub station_id: Option<String>,
    pub year: Option<i32>,
}

/// Read-only paginated access to the daily and yearly tables.
pub struct QueryService<'a> {
    store: &'a WeatherStore,
}

impl<'a> QueryService<'a> {
    pub fn new(store: &'a WeatherStore) -> Self {
        Self { store }
    }

    pub fn daily(&self, filter: &DailyFilter, request: PageRequest) -> Result<Page<DailyObservation>> {
        debug!(?filter, ?request, "Querying daily observations");
        let results = self.store.fetch_daily(filter, request)?;
        Ok(Page::new(request, results))
    }

    pub fn yearly(&self, filter: &YearlyFilter, request: PageRequest) -> Result<Page<YearlyStat>> {
        debug!(?filter, ?request, "Querying yearly statistics");
        let results = self.store.fetch_yearly(filter, request)?;
        Ok(Page::new(request, results))
    }
}
