use anyhow::Result;

use crate::commands::CommandReport;
use crate::commands::fetch::{FetchOptions, fetch_step};
use crate::commands::summarize::{SummarizeOptions, summarize_step};
use crate::metrics::config::load_config;
use crate::metrics::paths::resolve_paths;

pub fn run(fetch: &FetchOptions, summarize: &SummarizeOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config(&paths)?;
    let mut report = CommandReport::new("run");

    let Some(outcome) = fetch_step(&paths, &cfg, fetch, &mut report) else {
        return Ok(report);
    };
    summarize_step(
        &paths,
        &cfg,
        summarize,
        &outcome.filename,
        &outcome.snapshot,
        &mut report,
    )?;
    Ok(report)
}
