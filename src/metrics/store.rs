//! Dated snapshot files under a single directory.
//!
//! Each snapshot lives at `<dir>/YYYY-MM-DD.json`. Zero-padded ISO dates sort
//! lexicographically in chronological order, so the directory listing is the
//! history index. The store assumes one writer per directory at a time and
//! takes no locks.

use crate::error::MetricsError;
use crate::metrics::snapshot::MetricsSnapshot;
use chrono_tz::Tz;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const SNAPSHOT_EXT: &str = ".json";

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    timezone: Tz,
}

fn is_snapshot_name(name: &str) -> bool {
    name.ends_with(SNAPSHOT_EXT) && !name.starts_with('.')
}

// An entry that cannot be read fails the listing; skipping it could make
// `find_previous` pick the wrong predecessor.
fn collect_snapshot_names<I>(dir: &Path, entries: I) -> Result<Vec<String>, MetricsError>
where
    I: IntoIterator<Item = io::Result<(Option<String>, bool)>>,
{
    let mut names = Vec::new();
    for entry in entries {
        let (name, is_file) = entry.map_err(|err| MetricsError::CorruptSnapshot {
            path: dir.display().to_string(),
            reason: format!("unable to read metrics directory entry: {err}"),
        })?;
        if let Some(name) = name
            && is_file
            && is_snapshot_name(&name)
        {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            dir: dir.into(),
            timezone,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn filename_for(&self, snapshot: &MetricsSnapshot) -> String {
        snapshot
            .last_updated
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d.json")
            .to_string()
    }

    pub fn save(&self, snapshot: &MetricsSnapshot) -> Result<String, MetricsError> {
        let filename = self.filename_for(snapshot);
        self.write(&filename, snapshot)?;
        Ok(filename)
    }

    fn write(&self, filename: &str, snapshot: &MetricsSnapshot) -> Result<(), MetricsError> {
        let path = self.dir.join(filename);
        let failure = |reason: String| MetricsError::PersistenceFailure {
            path: path.display().to_string(),
            reason,
        };

        fs::create_dir_all(&self.dir).map_err(|err| {
            failure(format!(
                "failed to create metrics directory {}: {err}",
                self.dir.display()
            ))
        })?;
        let data = serde_json::to_string_pretty(snapshot)
            .map_err(|err| failure(format!("failed to marshal metrics: {err}")))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .map_err(|err| failure(format!("failed to create temp file: {err}")))?;
        tmp.write_all(format!("{data}\n").as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|err| failure(format!("failed to write metrics file: {err}")))?;
        tmp.persist(&path)
            .map_err(|err| failure(format!("failed to write metrics file: {}", err.error)))?;

        tracing::info!(stage = "save", filename, "snapshot saved");
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<String>, MetricsError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(MetricsError::CorruptSnapshot {
                    path: self.dir.display().to_string(),
                    reason: format!("unable to read metrics directory: {err}"),
                });
            }
        };

        let entries = read_dir.map(|entry| -> io::Result<(Option<String>, bool)> {
            let entry = entry?;
            let is_file = entry.file_type()?.is_file();
            Ok((entry.file_name().to_str().map(str::to_string), is_file))
        });
        collect_snapshot_names(&self.dir, entries)
    }

    pub fn load(&self, filename: &str) -> Result<MetricsSnapshot, MetricsError> {
        let path = self.dir.join(filename);
        let raw = fs::read_to_string(&path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                MetricsError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                MetricsError::CorruptSnapshot {
                    path: path.display().to_string(),
                    reason: format!("unable to read metrics file: {err}"),
                }
            }
        })?;
        serde_json::from_str(&raw).map_err(|err| MetricsError::CorruptSnapshot {
            path: path.display().to_string(),
            reason: format!("unable to parse metrics JSON: {err}"),
        })
    }

    pub fn latest(&self) -> Result<Option<(String, MetricsSnapshot)>, MetricsError> {
        let Some(filename) = self.list()?.pop() else {
            return Ok(None);
        };
        tracing::info!(stage = "load", filename, "loading latest snapshot");
        let snapshot = self.load(&filename)?;
        Ok(Some((filename, snapshot)))
    }

    /// The snapshot saved immediately before `current_filename`.
    ///
    /// Fails with `NoPredecessor` when `current_filename` is not in the
    /// directory or is the oldest entry.
    pub fn find_previous(&self, current_filename: &str) -> Result<MetricsSnapshot, MetricsError> {
        let names = self.list()?;
        let no_predecessor = || MetricsError::NoPredecessor {
            filename: current_filename.to_string(),
        };
        let index = names
            .iter()
            .position(|name| name == current_filename)
            .ok_or_else(no_predecessor)?;
        if index == 0 {
            return Err(no_predecessor());
        }
        self.load(&names[index - 1])
    }

    pub fn attach_summary_and_resave(
        &self,
        filename: &str,
        snapshot: &MetricsSnapshot,
        summary: Option<&str>,
        delta_analysis: Option<&str>,
    ) -> Result<MetricsSnapshot, MetricsError> {
        let updated = snapshot.with_summary(summary, delta_analysis);
        self.write(filename, &updated)?;
        Ok(updated)
    }
}
