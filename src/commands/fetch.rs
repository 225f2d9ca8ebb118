use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;

use crate::commands::{CommandReport, open_store};
use crate::metrics::aggregate::aggregate;
use crate::metrics::audit;
use crate::metrics::config::{ReadingConfig, load_config};
use crate::metrics::ingest::{RowSource, RowsFile};
use crate::metrics::paths::{ReadingPaths, resolve_paths};
use crate::metrics::row::{ParsePolicy, parse_rows};
use crate::metrics::snapshot::MetricsSnapshot;
use crate::sheets::client::SheetsSource;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub rows_file: Option<PathBuf>,
    pub policy: Option<ParsePolicy>,
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub source: String,
    pub filename: String,
    pub snapshot: MetricsSnapshot,
    pub fetched_rows: usize,
    pub skipped_rows: Vec<String>,
}

fn select_source(cfg: &ReadingConfig, opts: &FetchOptions) -> Result<Box<dyn RowSource>> {
    if let Some(path) = opts.rows_file.clone().or_else(|| cfg.source.rows_file.clone()) {
        return Ok(Box::new(RowsFile { path }));
    }
    let Some(sheet_id) = cfg.source.sheet_id.as_deref() else {
        anyhow::bail!("SHEET_ID environment variable is required (or pass --rows <file>)");
    };
    Ok(Box::new(SheetsSource::from_env(sheet_id, &cfg.source.range)?))
}

pub fn fetch_and_save(
    paths: &ReadingPaths,
    cfg: &ReadingConfig,
    opts: &FetchOptions,
) -> Result<FetchOutcome> {
    let source = select_source(cfg, opts).context("fetch stage")?;
    let batch = source
        .fetch()
        .with_context(|| format!("fetch stage: failed to fetch rows from {}", source.describe()))?;

    let policy = opts.policy.unwrap_or(cfg.parse.mode);
    let parsed = parse_rows(&batch.rows, policy).context("parse stage")?;

    let mut snapshot = aggregate(&parsed.articles, Utc::now());
    if let Some(count) = batch.substack_author_count {
        snapshot = snapshot.with_substack_author_count(count);
    }
    for violation in snapshot.invariant_violations() {
        tracing::warn!(stage = "aggregate", %violation, "snapshot totals disagree");
    }

    let store = open_store(paths, cfg)?;
    let filename = store.save(&snapshot).context("save stage")?;

    Ok(FetchOutcome {
        source: source.describe(),
        filename,
        snapshot,
        fetched_rows: batch.rows.len(),
        skipped_rows: parsed
            .rejected
            .iter()
            .map(|r| format!("row {}: {}", r.index, r.error))
            .collect(),
    })
}

pub fn describe_outcome(outcome: &FetchOutcome, report: &mut CommandReport) {
    report.detail(format!("source={}", outcome.source));
    report.detail(format!("snapshot={}", outcome.filename));
    report.detail(format!("rows.fetched={}", outcome.fetched_rows));
    report.detail(format!("rows.skipped={}", outcome.skipped_rows.len()));
    for skipped in &outcome.skipped_rows {
        report.detail(format!("rows.skipped.reason={skipped}"));
    }
    report.detail(format!("total_articles={}", outcome.snapshot.total_articles));
    report.detail(format!("read_rate={:.2}", outcome.snapshot.read_rate));
    report.detail(format!(
        "avg_articles_per_month={:.2}",
        outcome.snapshot.avg_articles_per_month
    ));
}

pub fn fetch_step(
    paths: &ReadingPaths,
    cfg: &ReadingConfig,
    opts: &FetchOptions,
    report: &mut CommandReport,
) -> Option<FetchOutcome> {
    match fetch_and_save(paths, cfg, opts) {
        Ok(outcome) => {
            describe_outcome(&outcome, report);
            audit::record(
                paths,
                "fetch",
                "ok",
                &format!(
                    "saved {} ({} articles, {} rows skipped)",
                    outcome.filename,
                    outcome.snapshot.total_articles,
                    outcome.skipped_rows.len()
                ),
            );
            Some(outcome)
        }
        Err(err) => {
            let message = format!("{err:#}");
            audit::record(paths, "fetch", "failed", &message);
            report.issue(message);
            None
        }
    }
}

pub fn run(opts: &FetchOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("fetch");
    fetch_step(&paths, &cfg, opts, &mut report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn test_paths(root: &std::path::Path) -> ReadingPaths {
        ReadingPaths {
            home: root.to_path_buf(),
            metrics_dir: root.join("metrics"),
            site_dir: root.join("site"),
            logs_dir: root.join("logs"),
            config_file: root.join("reading-metrics.toml"),
        }
    }

    #[test]
    fn rows_file_wins_over_sheet_id() {
        let mut cfg = ReadingConfig::default();
        cfg.source.sheet_id = Some("sheet".into());
        let opts = FetchOptions {
            rows_file: Some(PathBuf::from("rows.json")),
            policy: None,
        };
        let source = select_source(&cfg, &opts).expect("source");
        assert_eq!(source.describe(), "file:rows.json");
    }

    #[test]
    fn no_source_configured_is_an_error() {
        let err = select_source(&ReadingConfig::default(), &FetchOptions::default())
            .err()
            .expect("error");
        assert!(err.to_string().contains("SHEET_ID"));
    }

    #[test]
    fn fetch_and_save_writes_snapshot_and_reports_skips() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let rows = tmp.path().join("rows.json");
        fs::write(
            &rows,
            r#"{"values": [
                ["2025-11-28","T1","u1","Substack","FALSE"],
                ["2025-11-27","T2","u2","GitHub","TRUE"],
                ["2025-11-28","Title"],
                ["2025-11-26","T3","u3","freecodecamp","TRUE"]
            ], "substackAuthorCount": 3}"#,
        )
        .expect("write rows");

        let opts = FetchOptions {
            rows_file: Some(rows),
            policy: Some(ParsePolicy::Skip),
        };
        let outcome = fetch_and_save(&paths, &ReadingConfig::default(), &opts).expect("fetch");
        assert_eq!(outcome.fetched_rows, 4);
        assert_eq!(outcome.skipped_rows.len(), 1);
        assert!(outcome.skipped_rows[0].starts_with("row 2:"));
        assert_eq!(outcome.snapshot.total_articles, 3);
        assert_eq!(outcome.snapshot.substack_author_count(), Some(3));
        assert!(paths.metrics_dir.join(&outcome.filename).is_file());
    }

    #[test]
    fn strict_policy_aborts_before_saving() {
        let tmp = tempdir().expect("tempdir");
        let paths = test_paths(tmp.path());
        let rows = tmp.path().join("rows.json");
        fs::write(&rows, r#"[["invalid-date","T","u","Substack","FALSE"]]"#).expect("write");

        let opts = FetchOptions {
            rows_file: Some(rows),
            policy: Some(ParsePolicy::Strict),
        };
        let err = fetch_and_save(&paths, &ReadingConfig::default(), &opts).expect_err("strict");
        let text = format!("{err:#}");
        assert!(text.contains("parse stage"));
        assert!(text.contains("row 0"));
        assert!(!paths.metrics_dir.exists());
    }
}
