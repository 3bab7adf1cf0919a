//! Output directory and artifact writers for one filter run.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::parse::JobRecord;
use crate::{Error, Result};

/// Where one filter run writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub dir: PathBuf,
    /// `%Y%m%d_%H%M%S`, shared by the directory, the file names and the CSV `fetchTimestamp`.
    pub timestamp: String,
    pub raw_responses: PathBuf,
    pub job_details: PathBuf,
    pub csv: PathBuf,
}

impl RunOutput {
    /// Lays out `{root}/{keyword}-{filter}_run_{timestamp}` without touching the filesystem.
    pub fn new(root: &Path, keyword: &str, filter: &str, started: DateTime<Local>) -> Self {
        let timestamp = started.format("%Y%m%d_%H%M%S").to_string();
        let prefix = format!("{keyword}-{filter}");
        let dir = root.join(format!("{prefix}_run_{timestamp}"));

        Self {
            raw_responses: dir.join(format!("{prefix}_raw_api_responses_{timestamp}.json")),
            job_details: dir.join(format!("{prefix}_job_details_{timestamp}.json")),
            csv: dir.join(format!("{prefix}_job_patterns_{timestamp}.csv")),
            dir,
            timestamp,
        }
    }

    /// Creates the run directory. An existing directory is fine.
    pub fn create(root: &Path, keyword: &str, filter: &str, started: DateTime<Local>) -> Result<Self> {
        let output = Self::new(root, keyword, filter, started);
        std::fs::create_dir_all(&output.dir).map_err(|source| Error::DirectoryCreation {
            path: output.dir.clone(),
            source,
        })?;
        tracing::info!(dir = %output.dir.display(), "output directory ready");
        Ok(output)
    }
}

/// Writes `data` as a pretty printed JSON array.
/// Returns `Ok(false)` without creating the file when there is nothing to write.
pub fn save_json<T: Serialize>(data: &[T], path: &Path) -> Result<bool> {
    if data.is_empty() {
        tracing::info!(path = %path.display(), "no data, skipping");
        return Ok(false);
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.flush()?;
    tracing::info!(path = %path.display(), entries = data.len(), "saved JSON");
    Ok(true)
}

/// Writes the records with a header row in `columns` order. Unknown columns stay empty.
/// Returns `Ok(false)` without creating the file when there are no records.
pub fn save_csv(records: &[JobRecord], columns: &[String], path: &Path) -> Result<bool> {
    if records.is_empty() {
        tracing::info!(path = %path.display(), "no jobs, skipping");
        return Ok(false);
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|c| record.field(c).unwrap_or("")))?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), jobs = records.len(), "saved CSV");
    Ok(true)
}
