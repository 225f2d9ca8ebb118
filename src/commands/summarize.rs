use anyhow::Result;

use crate::commands::{CommandReport, open_store};
use crate::metrics::audit;
use crate::metrics::config::{ReadingConfig, load_config};
use crate::metrics::paths::{ReadingPaths, resolve_paths};
use crate::metrics::snapshot::MetricsSnapshot;
use crate::metrics::summarize::{SummarizerProvider, build_summarizer, generate_delta_analysis};

#[derive(Debug, Clone, Default)]
pub struct SummarizeOptions {
    pub provider: Option<SummarizerProvider>,
}

pub fn summarize_step(
    paths: &ReadingPaths,
    cfg: &ReadingConfig,
    opts: &SummarizeOptions,
    filename: &str,
    current: &MetricsSnapshot,
    report: &mut CommandReport,
) -> Result<()> {
    let provider = opts.provider.unwrap_or(cfg.summarizer.provider);
    report.detail(format!("summarizer.provider={}", provider.as_str()));

    let summarizer = match build_summarizer(
        provider,
        &cfg.summarizer.model,
        cfg.summarizer.timeout_secs,
    ) {
        Ok(Some(summarizer)) => summarizer,
        Ok(None) => {
            report.detail("skipping AI delta analysis: no summarizer configured");
            audit::record(paths, "summarize", "skipped", "no summarizer configured");
            return Ok(());
        }
        Err(err) => {
            report.detail(format!("skipping AI delta analysis: {err}"));
            audit::record(paths, "summarize", "skipped", &err.to_string());
            return Ok(());
        }
    };

    let store = open_store(paths, cfg)?;
    match generate_delta_analysis(&store, filename, current, summarizer.as_ref()) {
        Ok(outcome) => {
            report.detail(format!("snapshot={}", outcome.filename));
            report.detail(format!("summary.previous_found={}", outcome.had_previous));
            report.detail(format!("summary.placeholder={}", outcome.used_placeholder));
            report.detail(format!(
                "summary.chars={}",
                outcome.snapshot.ai_delta_analysis.chars().count()
            ));
            let status = if outcome.used_placeholder {
                "degraded"
            } else {
                "ok"
            };
            audit::record(
                paths,
                "summarize",
                status,
                &format!("updated {} via {}", outcome.filename, outcome.provider),
            );
        }
        Err(err) => {
            let message = format!("summarize stage: {err}");
            audit::record(paths, "summarize", "failed", &message);
            report.issue(message);
        }
    }
    Ok(())
}

pub fn run(opts: &SummarizeOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("summarize");

    let store = open_store(&paths, &cfg)?;
    let latest = match store.latest() {
        Ok(latest) => latest,
        Err(err) => {
            report.issue(format!("summarize stage: {err}"));
            return Ok(report);
        }
    };
    let Some((filename, current)) = latest else {
        report.detail(format!(
            "no metrics files found in {}; nothing to summarize",
            store.dir().display()
        ));
        return Ok(report);
    };

    summarize_step(&paths, &cfg, opts, &filename, &current, &mut report)?;
    Ok(report)
}
