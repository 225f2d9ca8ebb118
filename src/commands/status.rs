use anyhow::Result;
use std::env;

use crate::commands::{CommandReport, open_store};
use crate::metrics::config::load_config;
use crate::metrics::paths::resolve_paths;

include!(concat!(env!("OUT_DIR"), "/reading_env_allowlist.rs"));

fn unknown_reading_vars<I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut unknown: Vec<String> = keys
        .into_iter()
        .filter(|key| key.starts_with("READING_"))
        .filter(|key| !GENERATED_READING_ENV_ALLOWLIST.contains(&key.as_str()))
        .collect();
    unknown.sort();
    unknown
}

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("status");
    report.detail(format!("build={}", env!("BUILD_UUID")));

    let paths = resolve_paths()?;
    report.detail(format!("home={}", paths.home.display()));
    report.detail(format!("metrics_dir={}", paths.metrics_dir.display()));
    report.detail(format!("site_dir={}", paths.site_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    report.detail(format!(
        "config_file={} (present={})",
        paths.config_file.display(),
        paths.config_file.is_file()
    ));

    let cfg = match load_config(&paths) {
        Ok(cfg) => cfg,
        Err(err) => {
            report.issue(format!("config invalid: {err:#}"));
            return Ok(report);
        }
    };
    let source = match (&cfg.source.rows_file, &cfg.source.sheet_id) {
        (Some(path), _) => format!("file:{}", path.display()),
        (None, Some(sheet_id)) => format!("sheet:{sheet_id}!{}", cfg.source.range),
        (None, None) => "unset".to_string(),
    };
    report.detail(format!("source={source}"));
    report.detail(format!("parse.mode={}", cfg.parse.mode.as_str()));
    report.detail(format!("snapshot.timezone={}", cfg.snapshot.timezone));
    report.detail(format!(
        "summarizer.provider={}",
        cfg.summarizer.provider.as_str()
    ));
    report.detail(format!("summarizer.model={}", cfg.summarizer.model));

    let store = open_store(&paths, &cfg)?;
    match store.list() {
        Ok(files) => {
            report.detail(format!("snapshots={}", files.len()));
            if let Some(latest) = files.last() {
                report.detail(format!("snapshots.latest={latest}"));
            }
        }
        Err(err) => report.issue(format!("snapshot listing failed: {err}")),
    }

    for key in unknown_reading_vars(env::vars().map(|(key, _)| key)) {
        report.issue(format!("unknown environment variable {key}"));
    }
    Ok(report)
}
