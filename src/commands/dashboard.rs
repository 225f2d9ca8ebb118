use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::commands::{CommandReport, open_store};
use crate::metrics::audit;
use crate::metrics::chart::{DashboardData, project};
use crate::metrics::config::load_config;
use crate::metrics::paths::resolve_paths;

pub const DASHBOARD_FILE: &str = "dashboard.json";

fn write_dashboard(site_dir: &Path, data: &DashboardData) -> Result<PathBuf> {
    fs::create_dir_all(site_dir)
        .with_context(|| format!("failed to create site directory {}", site_dir.display()))?;
    let target = site_dir.join(DASHBOARD_FILE);
    let body = serde_json::to_string_pretty(data)?;

    let mut tmp = tempfile::NamedTempFile::new_in(site_dir)
        .with_context(|| format!("failed to stage {}", target.display()))?;
    tmp.write_all(format!("{body}\n").as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok(target)
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("dashboard");

    let store = open_store(&paths, &cfg)?;
    let Some((filename, snapshot)) = store.latest()? else {
        report.issue(format!(
            "no metrics files found in {}",
            store.dir().display()
        ));
        return Ok(report);
    };

    let data = project(&snapshot);
    let target = write_dashboard(&paths.site_dir, &data)?;
    report.detail(format!("snapshot={filename}"));
    report.detail(format!("dashboard={}", target.display()));
    report.detail(format!("sources={}", data.sources.len()));
    report.detail(format!("years={}", data.years.len()));
    report.detail(format!("months={}", data.months.len()));
    audit::record(
        &paths,
        "dashboard",
        "ok",
        &format!("projected {filename} into {}", target.display()),
    );
    Ok(report)
}
