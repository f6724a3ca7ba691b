pub mod observation;
pub mod summary;
pub mod yearly;

pub use observation::{DailyObservation, MergeRow, Observation};
pub use summary::{FileFailure, LineTally, RunSummary};
pub use yearly::YearlyStat;
