use crate::config::{FileErrorPolicy, Settings};
use crate::error::{ProcessingError, Result};
use crate::models::RunSummary;
use crate::processors::discovery::discover_station_files;
use crate::processors::upsert::UpsertApplier;
use crate::readers::StationFile;
use crate::store::{ObservationSink, RunStore};
use crate::utils::progress::ProgressReporter;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Loading,
    Applying,
    Committing,
    Reported,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Discovering => "discovering",
            RunState::Loading => "loading",
            RunState::Applying => "applying",
            RunState::Committing => "committing",
            RunState::Reported => "reported",
            RunState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// How a run that did not fail ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// No files matched; the store was never opened
    NothingToDo(RunSummary),
    Completed(RunSummary),
    /// Committed, but some files could not be read and were skipped
    Partial(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::NothingToDo(summary)
            | RunOutcome::Completed(summary)
            | RunOutcome::Partial(summary) => summary,
        }
    }

    pub fn into_summary(self) -> RunSummary {
        match self {
            RunOutcome::NothingToDo(summary)
            | RunOutcome::Completed(summary)
            | RunOutcome::Partial(summary) => summary,
        }
    }

    /// True when every discovered file made it into the commit
    pub fn is_complete(&self) -> bool {
        !matches!(self, RunOutcome::Partial(_))
    }
}

/// One ingestion run: discover, load and apply every file, then commit once.
pub struct IngestionRun {
    data_path: PathBuf,
    file_pattern: String,
    on_file_error: FileErrorPolicy,
    state: RunState,
    failed_while: Option<RunState>,
}

impl IngestionRun {
    pub fn new(data_path: impl Into<PathBuf>, file_pattern: impl Into<String>) -> Self {
        Self {
            data_path: data_path.into(),
            file_pattern: file_pattern.into(),
            on_file_error: FileErrorPolicy::default(),
            state: RunState::Idle,
            failed_while: None,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.data_dir(), settings.file_pattern.clone())
            .with_file_error_policy(settings.on_file_error)
    }

    pub fn with_file_error_policy(mut self, policy: FileErrorPolicy) -> Self {
        self.on_file_error = policy;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The state the run was in when it failed, if it failed
    pub fn failed_while(&self) -> Option<RunState> {
        self.failed_while
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Discover files and ingest them. `connect` is only called when there is work.
    pub fn execute<S, C>(&mut self, connect: C, progress: Option<&ProgressReporter>) -> Result<RunOutcome>
    where
        S: RunStore,
        C: FnOnce() -> Result<S>,
    {
        let mut summary = RunSummary::start();
        info!("Starting weather ingestion from {}", self.data_path.display());

        self.transition(RunState::Discovering);
        let files = match discover_station_files(&self.data_path, &self.file_pattern) {
            Ok(files) => files,
            Err(e) => return Err(self.fail(e)),
        };

        if files.is_empty() {
            warn!(
                "No weather files found at {}",
                self.data_path.join(&self.file_pattern).display()
            );
            summary.finish();
            self.transition(RunState::Reported);
            return Ok(RunOutcome::NothingToDo(summary));
        }

        self.ingest_files(&files, summary, connect, progress)
    }

    /// Ingest an explicit list of files in the given order.
    pub fn ingest_files<S, C>(
        &mut self,
        files: &[PathBuf],
        mut summary: RunSummary,
        connect: C,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunOutcome>
    where
        S: RunStore,
        C: FnOnce() -> Result<S>,
    {
        summary.files_discovered = files.len();
        if let Some(p) = progress {
            p.set_length(files.len() as u64);
        }

        match self.apply_and_commit(files, &mut summary, connect, progress) {
            Ok(()) => {
                summary.finish();
                self.transition(RunState::Reported);
                info!(
                    "Completed weather ingestion. Total records processed: {}. Start: {} | End: {}",
                    summary.records_applied,
                    summary.started_at.to_rfc3339(),
                    summary
                        .finished_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_default()
                );
                if let Some(p) = progress {
                    p.finish_with_message(&format!(
                        "Applied {} records from {} files",
                        summary.records_applied, summary.files_processed
                    ));
                }

                if summary.files_failed.is_empty() {
                    Ok(RunOutcome::Completed(summary))
                } else {
                    warn!(
                        "{} of {} station files were skipped",
                        summary.files_failed.len(),
                        summary.files_discovered
                    );
                    Ok(RunOutcome::Partial(summary))
                }
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn apply_and_commit<S, C>(
        &mut self,
        files: &[PathBuf],
        summary: &mut RunSummary,
        connect: C,
        progress: Option<&ProgressReporter>,
    ) -> Result<()>
    where
        S: RunStore,
        C: FnOnce() -> Result<S>,
    {
        self.transition(RunState::Loading);
        let mut store = connect()?;
        let mut batch = store.begin()?;

        {
            let mut applier = UpsertApplier::new(&mut batch);

            for path in files {
                if let Some(p) = progress {
                    p.set_message(&format!("Processing {}", path.display()));
                }

                self.transition(RunState::Loading);
                let loaded = match StationFile::read_all(path) {
                    Ok(loaded) => loaded,
                    Err(e) if e.is_file_access() && self.on_file_error == FileErrorPolicy::Skip => {
                        warn!("Skipping {}: {}", path.display(), e);
                        summary.record_failure(path.clone(), e.to_string());
                        if let Some(p) = progress {
                            p.increment(1);
                        }
                        continue;
                    }
                    Err(e) => return Err(e),
                };

                self.transition(RunState::Applying);
                let applied = applier.apply_all(
                    &loaded.station_id,
                    &loaded.source_file,
                    &loaded.observations,
                )?;

                info!(
                    "Processed file {} for station {}: {} records, {} malformed lines skipped",
                    path.display(),
                    loaded.station_id,
                    applied,
                    loaded.tally.malformed
                );
                summary.record_file(&loaded.tally, applied);

                if let Some(p) = progress {
                    p.increment(1);
                }
            }

            debug!("Applied {} observations in this run", applier.applied());
        }

        self.transition(RunState::Committing);
        batch.commit()
    }

    fn transition(&mut self, next: RunState) {
        if self.state != next {
            debug!("Ingestion run {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn fail(&mut self, e: ProcessingError) -> ProcessingError {
        error!("Weather ingestion failed while {}: {}", self.state, e);
        self.failed_while = Some(self.state);
        self.state = RunState::Failed;
        e
    }
}
