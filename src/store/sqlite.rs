use crate::error::{ProcessingError, Result};
use crate::models::{DailyObservation, MergeRow, YearlyStat};
use crate::query::{DailyFilter, PageRequest, YearlyFilter};
use crate::store::{ObservationSink, RunStore};
use crate::utils::constants::SCHEMA_VERSION;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, Transaction};
use std::path::Path;
use tracing::{debug, info};

const MERGE_SQL: &str = "
    INSERT INTO weather_daily_raw (
        station_id,
        date_key,
        max_temp_tenths,
        min_temp_tenths,
        precip_tenths,
        file_name
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(station_id, date_key) DO UPDATE SET
        max_temp_tenths=excluded.max_temp_tenths,
        min_temp_tenths=excluded.min_temp_tenths,
        precip_tenths=excluded.precip_tenths,
        file_name=excluded.file_name
";

const MATERIALIZE_YEARLY_SQL: &str = "
    INSERT INTO weather_yearly_stats (
        station_id,
        year,
        avg_max_temp_c,
        avg_min_temp_c,
        total_precip_cm
    )
    SELECT
        station_id,
        CAST(substr(date_key, 1, 4) AS INTEGER) AS year,
        AVG(max_temp_tenths) / 10.0,
        AVG(min_temp_tenths) / 10.0,
        SUM(precip_tenths) / 100.0
    FROM weather_daily_raw
    GROUP BY station_id, year
";

/// SQLite-backed warehouse holding the daily and yearly tables.
///
/// The connection is owned by the handle and closed when it drops.
pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening weather store at {}", path.display());
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an existing warehouse for reads only; never creates or migrates it.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ProcessingError::StoreNotFound(path.to_path_buf()));
        }

        debug!("Opening weather store read-only at {}", path.display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let store = Self { conn };

        let version = store.schema_version()?;
        if version != SCHEMA_VERSION {
            return Err(ProcessingError::Config(format!(
                "{} has schema version {}, expected {}",
                path.display(),
                version,
                SCHEMA_VERSION
            )));
        }
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<()> {
        let current = self.schema_version()?;
        if current > SCHEMA_VERSION {
            return Err(ProcessingError::Config(format!(
                "unsupported schema version {}, max supported {}",
                current, SCHEMA_VERSION
            )));
        }

        if current < 1 {
            let sql = include_str!("../../migrations/0001_weather_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn.execute_batch("PRAGMA user_version = 1")?;
        }

        Ok(())
    }

    pub fn daily_row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM weather_daily_raw", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Daily rows ordered by station then date
    pub fn fetch_daily(
        &self,
        filter: &DailyFilter,
        request: PageRequest,
    ) -> Result<Vec<DailyObservation>> {
        let mut sql = String::from(
            "SELECT station_id, date_key, max_temp_tenths, min_temp_tenths, precip_tenths, file_name
             FROM weather_daily_raw
             WHERE 1=1",
        );
        let mut args: Vec<Value> = Vec::new();

        if let Some(station_id) = &filter.station_id {
            sql.push_str(" AND station_id = ?");
            args.push(Value::Text(station_id.clone()));
        }

        if let Some(date) = filter.date {
            sql.push_str(" AND date_key = ?");
            args.push(Value::Text(date.format("%Y-%m-%d").to_string()));
        }

        sql.push_str(" ORDER BY station_id, date_key LIMIT ? OFFSET ?");
        push_page(&mut args, request);

        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement.query_map(params_from_iter(args.iter()), |row| {
            Ok(DailyObservation {
                station_id: row.get(0)?,
                date: row.get(1)?,
                max_temp_tenths: row.get(2)?,
                min_temp_tenths: row.get(3)?,
                precip_tenths: row.get(4)?,
                source_file: row.get(5)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Yearly aggregates ordered by station then year
    pub fn fetch_yearly(&self, filter: &YearlyFilter, request: PageRequest) -> Result<Vec<YearlyStat>> {
        let mut sql = String::from(
            "SELECT station_id, year, avg_max_temp_c, avg_min_temp_c, total_precip_cm
             FROM weather_yearly_stats
             WHERE 1=1",
        );
        let mut args: Vec<Value> = Vec::new();

        if let Some(station_id) = &filter.station_id {
            sql.push_str(" AND station_id = ?");
            args.push(Value::Text(station_id.clone()));
        }

        if let Some(year) = filter.year {
            sql.push_str(" AND year = ?");
            args.push(Value::Integer(i64::from(year)));
        }

        sql.push_str(" ORDER BY station_id, year LIMIT ? OFFSET ?");
        push_page(&mut args, request);

        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement.query_map(params_from_iter(args.iter()), |row| {
            Ok(YearlyStat {
                station_id: row.get(0)?,
                year: row.get(1)?,
                avg_max_temp_c: row.get(2)?,
                avg_min_temp_c: row.get(3)?,
                total_precip_cm: row.get(4)?,
            })
        })?;

        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Rebuild the yearly table from the daily table. Returns rows written.
    pub fn materialize_yearly_stats(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM weather_yearly_stats", [])?;
        let written = tx.execute(MATERIALIZE_YEARLY_SQL, [])?;
        tx.commit()?;

        info!("Materialized {} yearly statistics rows", written);
        Ok(written)
    }
}

#[cfg(test)]
impl WeatherStore {
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn push_page(args: &mut Vec<Value>, request: PageRequest) {
    args.push(Value::Integer(i64::from(request.limit())));
    args.push(Value::Integer(
        i64::try_from(request.offset()).unwrap_or(i64::MAX),
    ));
}

impl RunStore for WeatherStore {
    type Batch<'a> = RunTransaction<'a>;

    fn begin(&mut self) -> Result<RunTransaction<'_>> {
        Ok(RunTransaction {
            tx: self.conn.transaction()?,
            merged: 0,
        })
    }
}

/// The one transaction an ingestion run writes through.
pub struct RunTransaction<'a> {
    tx: Transaction<'a>,
    merged: usize,
}

impl RunTransaction<'_> {
    pub fn merged(&self) -> usize {
        self.merged
    }
}

impl ObservationSink for RunTransaction<'_> {
    fn merge(&mut self, row: &MergeRow<'_>) -> Result<()> {
        let mut statement = self.tx.prepare_cached(MERGE_SQL)?;
        statement.execute(params![
            row.station_id,
            row.observation.date,
            row.observation.max_temp_tenths,
            row.observation.min_temp_tenths,
            row.observation.precip_tenths,
            row.source_file,
        ])?;
        self.merged += 1;
        Ok(())
    }

    fn commit(self) -> Result<()> {
        debug!("Committing {} merged rows", self.merged);
        self.tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Observation;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn merge_all(store: &mut WeatherStore, rows: &[(&str, Observation, &str)]) -> Result<()> {
        let mut batch = store.begin()?;
        for (station_id, observation, source_file) in rows {
            batch.merge(&MergeRow {
                station_id: *station_id,
                observation,
                source_file: *source_file,
            })?;
        }
        batch.commit()
    }

    fn all_daily(store: &WeatherStore) -> Vec<DailyObservation> {
        store
            .fetch_daily(&DailyFilter::default(), PageRequest::normalize(None, Some(500)))
            .unwrap()
    }

    #[test]
    fn test_open_applies_schema() -> Result<()> {
        let store = WeatherStore::open_in_memory()?;
        assert_eq!(store.schema_version()?, SCHEMA_VERSION);
        assert_eq!(store.daily_row_count()?, 0);

        // Migrating again is a no-op
        store.migrate()?;
        assert_eq!(store.schema_version()?, SCHEMA_VERSION);
        Ok(())
    }

    #[test]
    fn test_read_only_open_requires_existing_warehouse() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("weather.db");

        let err = WeatherStore::open_read_only(&path).err().unwrap();
        assert!(matches!(err, ProcessingError::StoreNotFound(_)));
        assert!(!path.exists());

        std::fs::write(&path, "")?;
        let err = WeatherStore::open_read_only(&path).err().unwrap();
        assert!(matches!(err, ProcessingError::Config(_)));

        std::fs::remove_file(&path)?;
        let mut store = WeatherStore::open(&path)?;
        let observation = Observation::new(date(2023, 1, 1), Some(1), Some(2), Some(3));
        merge_all(&mut store, &[("ST001", observation, "ST001.txt")])?;
        drop(store);

        let reader = WeatherStore::open_read_only(&path)?;
        assert_eq!(all_daily(&reader).len(), 1);
        Ok(())
    }

    #[test]
    fn test_merge_is_idempotent() -> Result<()> {
        let mut store = WeatherStore::open_in_memory()?;
        let observation = Observation::new(date(2023, 1, 1), Some(150), Some(-50), Some(0));

        merge_all(&mut store, &[("ST001", observation, "ST001.txt")])?;
        let once = all_daily(&store);

        merge_all(&mut store, &[("ST001", observation, "ST001.txt")])?;
        let twice = all_daily(&store);

        assert_eq!(once, twice);
        assert_eq!(store.daily_row_count()?, 1);
        Ok(())
    }

    #[test]
    fn test_merge_overwrites_existing_key() -> Result<()> {
        let mut store = WeatherStore::open_in_memory()?;
        let first = Observation::new(date(2023, 1, 1), Some(150), Some(-50), Some(0));
        let second = Observation::new(date(2023, 1, 1), None, Some(-70), Some(25));

        merge_all(
            &mut store,
            &[("ST001", first, "old/ST001.txt"), ("ST001", second, "new/ST001.txt")],
        )?;

        let rows = all_daily(&store);
        assert_eq!(
            rows,
            vec![DailyObservation {
                station_id: "ST001".to_string(),
                date: date(2023, 1, 1),
                max_temp_tenths: None,
                min_temp_tenths: Some(-70),
                precip_tenths: Some(25),
                source_file: "new/ST001.txt".to_string(),
            }]
        );
        Ok(())
    }

    #[test]
    fn test_uncommitted_batch_rolls_back() -> Result<()> {
        let mut store = WeatherStore::open_in_memory()?;
        let observation = Observation::new(date(2023, 1, 1), Some(1), Some(2), Some(3));

        {
            let mut batch = store.begin()?;
            batch.merge(&MergeRow {
                station_id: "ST001",
                observation: &observation,
                source_file: "ST001.txt",
            })?;
            assert_eq!(batch.merged(), 1);
        }

        assert_eq!(store.daily_row_count()?, 0);
        Ok(())
    }

    #[test]
    fn test_fetch_daily_filters_and_orders() -> Result<()> {
        let mut store = WeatherStore::open_in_memory()?;
        merge_all(
            &mut store,
            &[
                ("ST002", Observation::new(date(2023, 1, 1), Some(1), None, None), "b"),
                ("ST001", Observation::new(date(2023, 1, 2), Some(2), None, None), "a"),
                ("ST001", Observation::new(date(2023, 1, 1), Some(3), None, None), "a"),
            ],
        )?;

        let keys: Vec<(String, NaiveDate)> = all_daily(&store)
            .into_iter()
            .map(|r| (r.station_id, r.date))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("ST001".to_string(), date(2023, 1, 1)),
                ("ST001".to_string(), date(2023, 1, 2)),
                ("ST002".to_string(), date(2023, 1, 1)),
            ]
        );

        let filter = DailyFilter {
            station_id: Some("ST001".to_string()),
            date: Some(date(2023, 1, 2)),
        };
        let rows = store.fetch_daily(&filter, PageRequest::default())?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].max_temp_tenths, Some(2));

        let second_page = store.fetch_daily(
            &DailyFilter::default(),
            PageRequest::normalize(Some(2), Some(2)),
        )?;
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].station_id, "ST002");
        Ok(())
    }

    #[test]
    fn test_materialize_yearly_stats() -> Result<()> {
        let mut store = WeatherStore::open_in_memory()?;
        merge_all(
            &mut store,
            &[
                ("ST001", Observation::new(date(2022, 12, 31), Some(100), Some(0), Some(40)), "a"),
                ("ST001", Observation::new(date(2023, 1, 1), Some(150), Some(-50), Some(0)), "a"),
                ("ST001", Observation::new(date(2023, 1, 2), None, Some(-60), Some(10)), "a"),
                ("ST002", Observation::new(date(2023, 6, 1), None, None, None), "b"),
            ],
        )?;

        assert_eq!(store.materialize_yearly_stats()?, 3);
        // Rebuilding replaces rather than accumulates
        assert_eq!(store.materialize_yearly_stats()?, 3);

        let stats = store.fetch_yearly(&YearlyFilter::default(), PageRequest::default())?;
        assert_eq!(stats.len(), 3);

        assert_eq!(stats[0].station_id, "ST001");
        assert_eq!(stats[0].year, 2022);

        let st001_2023 = &stats[1];
        assert_eq!(st001_2023.year, 2023);
        assert_eq!(st001_2023.avg_max_temp_c, Some(15.0));
        assert_eq!(st001_2023.avg_min_temp_c, Some(-5.5));
        assert_eq!(st001_2023.total_precip_cm, Some(0.1));

        let st002 = &stats[2];
        assert_eq!(st002.avg_max_temp_c, None);
        assert_eq!(st002.total_precip_cm, None);

        let filter = YearlyFilter {
            station_id: Some("ST001".to_string()),
            year: Some(2022),
        };
        let filtered = store.fetch_yearly(&filter, PageRequest::default())?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].total_precip_cm, Some(0.4));
        Ok(())
    }
}
