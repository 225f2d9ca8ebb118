use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::fetch::FetchOptions;
use crate::commands::summarize::SummarizeOptions;
use crate::commands::{self, CommandReport};
use crate::logging;
use crate::metrics::row::ParsePolicy;
use crate::metrics::summarize::SummarizerProvider;

#[derive(Debug, Parser)]
#[command(
    name = "reading-metrics",
    version,
    about = "Aggregate a reading log into dated metrics snapshots"
)]
struct Cli {
    /// Debug-level logging on stderr.
    #[arg(long, global = true)]
    verbose: bool,
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct FetchArgs {
    /// Read rows from a local JSON file instead of the sheet.
    #[arg(long)]
    rows: Option<PathBuf>,
    /// Abort on the first malformed row.
    #[arg(long, conflicts_with = "skip_invalid")]
    strict: bool,
    /// Skip malformed rows and report them.
    #[arg(long)]
    skip_invalid: bool,
}

impl FetchArgs {
    fn options(&self) -> FetchOptions {
        let policy = if self.strict {
            Some(ParsePolicy::Strict)
        } else if self.skip_invalid {
            Some(ParsePolicy::Skip)
        } else {
            None
        };
        FetchOptions {
            rows_file: self.rows.clone(),
            policy,
        }
    }
}

#[derive(Debug, Args)]
struct SummarizeArgs {
    /// auto, gemini, local or none.
    #[arg(long)]
    provider: Option<SummarizerProvider>,
}

impl SummarizeArgs {
    fn options(&self) -> SummarizeOptions {
        SummarizeOptions {
            provider: self.provider,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch rows, aggregate, and save today's snapshot.
    Fetch(FetchArgs),
    /// Attach a delta analysis to the latest snapshot.
    Summarize(SummarizeArgs),
    /// Fetch, then summarize the snapshot just written.
    Run {
        #[command(flatten)]
        fetch: FetchArgs,
        #[command(flatten)]
        summarize: SummarizeArgs,
    },
    /// Project the latest snapshot into dashboard chart data.
    Dashboard,
    /// Show resolved paths, config and stored snapshots.
    Status,
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    let state = if report.ok { "ok" } else { "failed" };
    println!("{}: {state}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  issue: {issue}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let report = match &cli.command {
        Command::Fetch(args) => commands::fetch::run(&args.options())?,
        Command::Summarize(args) => commands::summarize::run(&args.options())?,
        Command::Run { fetch, summarize } => {
            commands::run::run(&fetch.options(), &summarize.options())?
        }
        Command::Dashboard => commands::dashboard::run()?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    if !report.ok {
        anyhow::bail!("{} failed: {}", report.command, report.issues.join("; "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn strict_and_skip_flags_conflict() {
        let parsed = Cli::try_parse_from(["reading-metrics", "fetch", "--strict", "--skip-invalid"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn fetch_flags_map_to_policy() {
        let cli = Cli::try_parse_from(["reading-metrics", "fetch", "--strict", "--rows", "r.json"])
            .expect("parse");
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        let opts = args.options();
        assert_eq!(opts.policy, Some(ParsePolicy::Strict));
        assert_eq!(opts.rows_file, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn provider_parses_from_flag() {
        let cli = Cli::try_parse_from(["reading-metrics", "summarize", "--provider", "local"])
            .expect("parse");
        let Command::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.options().provider, Some(SummarizerProvider::Local));
    }
}
