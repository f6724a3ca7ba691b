use crate::error::{ProcessingError, Result};
use crate::models::{LineTally, Observation};
use crate::readers::record_parser::{ParsedLine, RecordParser};
use crate::utils::constants::DEFAULT_BUFFER_SIZE;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A fully read station file: what the coordinator hands to the applier.
#[derive(Debug, Clone)]
pub struct LoadedStationFile {
    pub station_id: String,
    pub source_file: String,
    pub observations: Vec<Observation>,
    pub tally: LineTally,
}

/// Lazy, single-pass reader over one station file.
///
/// Yields valid observations in file order. Blank and malformed lines are
/// consumed silently and counted in [`StationFile::tally`].
pub struct StationFile {
    station_id: String,
    path: PathBuf,
    reader: BufReader<File>,
    parser: RecordParser,
    tally: LineTally,
    buffer: Vec<u8>,
}

impl StationFile {
    pub fn open(path: &Path) -> Result<Self> {
        let station_id = station_id_from_path(path)?;
        let file = File::open(path).map_err(|e| ProcessingError::file_access(path, e))?;

        Ok(Self {
            station_id,
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file),
            parser: RecordParser::new(),
            tally: LineTally::default(),
            buffer: Vec::new(),
        })
    }

    /// Read a whole file in one pass, keeping only valid observations
    pub fn read_all(path: &Path) -> Result<LoadedStationFile> {
        let mut file = Self::open(path)?;
        let observations = file.by_ref().collect::<Result<Vec<_>>>()?;

        debug!(
            "Read {} ({} valid, {} malformed, {} blank lines)",
            path.display(),
            file.tally.valid,
            file.tally.malformed,
            file.tally.blank
        );

        Ok(LoadedStationFile {
            source_file: file.source_file(),
            station_id: file.station_id,
            observations,
            tally: file.tally,
        })
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Provenance string stored alongside each row
    pub fn source_file(&self) -> String {
        self.path.display().to_string()
    }

    pub fn tally(&self) -> LineTally {
        self.tally
    }
}

impl Iterator for StationFile {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();

            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None, // EOF
                Ok(_) => {
                    // Undecodable bytes make the line malformed, not the file unreadable
                    let Ok(line) = std::str::from_utf8(&self.buffer) else {
                        self.tally.record_malformed();
                        debug!("{}: line {} is not UTF-8", self.path.display(), self.tally.total);
                        continue;
                    };

                    match self.parser.classify(line) {
                        ParsedLine::Blank => self.tally.record_blank(),
                        ParsedLine::Rejected(reason) => {
                            self.tally.record_malformed();
                            debug!(
                                "{}: skipping line {}: {}",
                                self.path.display(),
                                self.tally.total,
                                reason
                            );
                        }
                        ParsedLine::Record(observation) => {
                            self.tally.record_valid();
                            return Some(Ok(observation));
                        }
                    }
                }
                Err(e) => return Some(Err(ProcessingError::file_access(&self.path, e))),
            }
        }
    }
}

/// Station identifier is the file name without its extension (e.g. ST001.txt -> ST001)
pub fn station_id_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProcessingError::InvalidStationFile(path.display().to_string()))
}
