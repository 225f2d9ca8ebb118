pub mod dashboard;
pub mod fetch;
pub mod run;
pub mod status;
pub mod summarize;

use crate::metrics::config::ReadingConfig;
use crate::metrics::paths::ReadingPaths;
use crate::metrics::store::SnapshotStore;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub command: String,
    pub ok: bool,
    pub details: Vec<String>,
    pub issues: Vec<String>,
}

impl CommandReport {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ok: true,
            details: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn detail(&mut self, text: impl Into<String>) {
        self.details.push(text.into());
    }

    pub fn issue(&mut self, text: impl Into<String>) {
        self.ok = false;
        self.issues.push(text.into());
    }
}

pub fn open_store(paths: &ReadingPaths, cfg: &ReadingConfig) -> Result<SnapshotStore> {
    Ok(SnapshotStore::new(&paths.metrics_dir, cfg.timezone()?))
}
