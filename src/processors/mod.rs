pub mod discovery;
pub mod ingestion_run;
pub mod upsert;

pub use discovery::discover_station_files;
pub use ingestion_run::{IngestionRun, RunOutcome, RunState};
pub use upsert::UpsertApplier;
