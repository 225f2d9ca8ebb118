use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ReadingPaths {
    pub home: PathBuf,
    pub metrics_dir: PathBuf,
    pub site_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub config_file: PathBuf,
}

fn env_path(var: &str) -> Option<PathBuf> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        _ => None,
    }
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    env_path(var).unwrap_or(fallback)
}

pub fn resolve_paths() -> Result<ReadingPaths> {
    let home = match env_path("READING_HOME") {
        Some(home) => home,
        None => env::current_dir().context("current directory could not be resolved")?,
    };

    let metrics_dir = env_or_default_path("READING_METRICS_DIR", home.join("metrics"));
    let site_dir = env_or_default_path("READING_SITE_DIR", home.join("site"));
    let logs_dir = env_or_default_path("READING_LOGS_DIR", home.join("logs"));
    let config_file =
        env_or_default_path("READING_CONFIG_PATH", home.join("reading-metrics.toml"));

    Ok(ReadingPaths {
        home,
        metrics_dir,
        site_dir,
        logs_dir,
        config_file,
    })
}
