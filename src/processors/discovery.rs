use crate::error::{ProcessingError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Find station files under `data_path` matching `pattern` (e.g. `*.txt`).
///
/// Results are sorted by path so repeated runs apply files in the same order.
/// An empty result is not an error; an inaccessible directory is.
pub fn discover_station_files(data_path: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(data_path).map_err(|e| ProcessingError::Discovery {
        path: data_path.to_path_buf(),
        message: e.to_string(),
    })?;

    if !metadata.is_dir() {
        return Err(ProcessingError::Discovery {
            path: data_path.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let root = data_path.to_str().ok_or_else(|| {
        ProcessingError::Config(format!(
            "data path is not valid UTF-8: {}",
            data_path.display()
        ))
    })?;
    let full_pattern = format!(
        "{}/{}",
        glob::Pattern::escape(root.trim_end_matches('/')),
        pattern
    );

    debug!("Searching for station files matching {}", full_pattern);

    let mut files = Vec::new();
    for entry in glob::glob(&full_pattern)? {
        let path = entry.map_err(|e| ProcessingError::Discovery {
            path: e.path().to_path_buf(),
            message: e.error().to_string(),
        })?;

        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    debug!("Found {} station files in {}", files.len(), data_path.display());

    Ok(files)
}
