use crate::error::{ProcessingError, Result};
use crate::models::{MergeRow, Observation};
use crate::store::ObservationSink;

/// Applies observations to a sink by natural key, counting what it applied.
///
/// Insert and update are indistinguishable here: each successful merge counts as one.
pub struct UpsertApplier<'s, S: ObservationSink> {
    sink: &'s mut S,
    applied: usize,
}

impl<'s, S: ObservationSink> UpsertApplier<'s, S> {
    pub fn new(sink: &'s mut S) -> Self {
        Self { sink, applied: 0 }
    }

    pub fn apply(
        &mut self,
        station_id: &str,
        source_file: &str,
        observation: &Observation,
    ) -> Result<usize> {
        let row = MergeRow {
            station_id,
            observation,
            source_file,
        };

        self.sink
            .merge(&row)
            .map_err(|e| ProcessingError::Merge {
                station_id: station_id.to_string(),
                date: observation.date,
                source: Box::new(e),
            })?;

        self.applied += 1;
        Ok(1)
    }

    /// Apply a file's observations in order; later duplicates of a key win.
    pub fn apply_all(
        &mut self,
        station_id: &str,
        source_file: &str,
        observations: &[Observation],
    ) -> Result<usize> {
        let mut applied = 0;
        for observation in observations {
            applied += self.apply(station_id, source_file, observation)?;
        }
        Ok(applied)
    }

    pub fn applied(&self) -> usize {
        self.applied
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    /// In-memory sink keyed like the warehouse table; can be told to fail.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub rows: BTreeMap<(String, NaiveDate), (Observation, String)>,
        pub merges: usize,
        pub fail_after: Option<usize>,
    }

    impl ObservationSink for MemorySink {
        fn merge(&mut self, row: &MergeRow<'_>) -> Result<()> {
            if self.fail_after.is_some_and(|limit| self.merges >= limit) {
                return Err(ProcessingError::Store(rusqlite::Error::InvalidQuery));
            }
            self.merges += 1;
            self.rows.insert(
                (row.station_id.to_string(), row.observation.date),
                (*row.observation, row.source_file.to_string()),
            );
            Ok(())
        }

        fn commit(self) -> Result<()> {
            Ok(())
        }
    }

    fn obs(day: u32, max: Option<i32>) -> Observation {
        Observation::new(NaiveDate::from_ymd_opt(2023, 1, day).unwrap(), max, Some(0), Some(0))
    }

    #[test]
    fn test_apply_counts_each_observation() {
        let mut sink = MemorySink::default();
        let mut applier = UpsertApplier::new(&mut sink);

        assert_eq!(applier.apply("ST001", "ST001.txt", &obs(1, Some(10))).unwrap(), 1);
        assert_eq!(
            applier
                .apply_all("ST001", "ST001.txt", &[obs(2, Some(20)), obs(3, None)])
                .unwrap(),
            2
        );
        assert_eq!(applier.applied(), 3);
        assert_eq!(sink.rows.len(), 3);
    }

    #[test]
    fn test_same_observation_twice_is_one_row() {
        let mut sink = MemorySink::default();
        let mut applier = UpsertApplier::new(&mut sink);

        applier.apply("ST001", "ST001.txt", &obs(1, Some(10))).unwrap();
        applier.apply("ST001", "ST001.txt", &obs(1, Some(10))).unwrap();

        // Both count as processed, but the key holds one row
        assert_eq!(applier.applied(), 2);
        assert_eq!(sink.rows.len(), 1);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let mut sink = MemorySink::default();
        let mut applier = UpsertApplier::new(&mut sink);

        applier
            .apply_all("ST001", "a/ST001.txt", &[obs(1, Some(10)), obs(1, Some(99))])
            .unwrap();
        applier.apply("ST001", "b/ST001.txt", &obs(1, Some(42))).unwrap();

        let key = ("ST001".to_string(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        let (observation, source) = &sink.rows[&key];
        assert_eq!(observation.max_temp_tenths, Some(42));
        assert_eq!(source, "b/ST001.txt");
    }

    #[test]
    fn test_store_failure_carries_key_context() {
        let mut sink = MemorySink {
            fail_after: Some(1),
            ..Default::default()
        };
        let mut applier = UpsertApplier::new(&mut sink);

        let err = applier
            .apply_all("ST001", "ST001.txt", &[obs(1, Some(1)), obs(2, Some(2))])
            .unwrap_err();

        match err {
            ProcessingError::Merge { station_id, date, .. } => {
                assert_eq!(station_id, "ST001");
                assert_eq!(date, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(applier.applied(), 1);
    }
}
