use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-line accounting for one file, or summed across a run.
///
/// Every line read lands in exactly one of `valid`, `malformed` or `blank`,
/// so `valid + malformed + blank == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTally {
    pub total: usize,
    pub valid: usize,
    pub malformed: usize,
    pub blank: usize,
}

impl LineTally {
    pub fn record_valid(&mut self) {
        self.total += 1;
        self.valid += 1;
    }

    pub fn record_malformed(&mut self) {
        self.total += 1;
        self.malformed += 1;
    }

    pub fn record_blank(&mut self) {
        self.total += 1;
        self.blank += 1;
    }

    pub fn absorb(&mut self, other: &LineTally) {
        self.total += other.total;
        self.valid += other.valid;
        self.malformed += other.malformed;
        self.blank += other.blank;
    }

    pub fn is_balanced(&self) -> bool {
        self.valid + self.malformed + self.blank == self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub cause: String,
}

/// Accounting for one ingestion run. Built while the run progresses and
/// finalized when it commits; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files_discovered: usize,
    pub files_processed: usize,
    pub files_empty: usize,
    pub files_failed: Vec<FileFailure>,
    pub lines: LineTally,
    pub records_applied: usize,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            files_discovered: 0,
            files_processed: 0,
            files_empty: 0,
            files_failed: Vec::new(),
            lines: LineTally::default(),
            records_applied: 0,
        }
    }

    pub fn record_file(&mut self, tally: &LineTally, applied: usize) {
        self.files_processed += 1;
        if applied == 0 {
            self.files_empty += 1;
        }
        self.lines.absorb(tally);
        self.records_applied += applied;
    }

    pub fn record_failure(&mut self, path: PathBuf, cause: String) {
        self.files_failed.push(FileFailure { path, cause });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn skipped_lines(&self) -> usize {
        self.lines.malformed
    }

    /// Render a human readable report
    pub fn render(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== Ingestion Run Summary ===\n");
        summary.push_str(&format!("Started:  {}\n", self.started_at.to_rfc3339()));
        match self.finished_at {
            Some(end) => summary.push_str(&format!("Finished: {}\n", end.to_rfc3339())),
            None => summary.push_str("Finished: (in progress)\n"),
        }
        summary.push_str(&format!("Files Discovered: {}\n", self.files_discovered));
        summary.push_str(&format!(
            "Files Processed: {} ({} empty)\n",
            self.files_processed, self.files_empty
        ));
        summary.push_str(&format!("Records Applied: {}\n", self.records_applied));
        summary.push_str(&format!(
            "Lines: {} total, {} valid, {} malformed, {} blank\n",
            self.lines.total, self.lines.valid, self.lines.malformed, self.lines.blank
        ));

        if !self.files_failed.is_empty() {
            summary.push_str(&format!("\nSkipped Files: {}\n", self.files_failed.len()));
            for (i, failure) in self.files_failed.iter().enumerate() {
                summary.push_str(&format!(
                    "  {}. {}: {}\n",
                    i + 1,
                    failure.path.display(),
                    failure.cause
                ));
            }
        }

        summary
    }
}
