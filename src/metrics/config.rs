use crate::metrics::paths::ReadingPaths;
use crate::metrics::row::ParsePolicy;
use crate::metrics::summarize::SummarizerProvider;
use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub sheet_id: Option<String>,
    pub range: String,
    pub rows_file: Option<PathBuf>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            range: "A2:E".to_string(),
            rows_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub mode: ParsePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub timezone: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub provider: SummarizerProvider,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: SummarizerProvider::Auto,
            model: "gemini-2.5-flash-lite".to_string(),
            timeout_secs: 45,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub source: SourceConfig,
    pub parse: ParseConfig,
    pub snapshot: SnapshotConfig,
    pub summarizer: SummarizerConfig,
}

impl ReadingConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.snapshot
            .timezone
            .trim()
            .parse::<Tz>()
            .map_err(|err| anyhow!("invalid snapshot timezone `{}`: {err}", self.snapshot.timezone))
    }
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    env_non_empty(var).unwrap_or_else(|| fallback.to_string())
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_parsed<T>(var: &str, fallback: T) -> Result<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    match env_non_empty(var) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|err| anyhow!("{var}: {err}")),
        None => Ok(fallback),
    }
}

fn validate(cfg: &ReadingConfig) -> Result<()> {
    if cfg.source.range.trim().is_empty() {
        return Err(anyhow!("invalid sheet range: cannot be empty"));
    }
    if let Some(sheet_id) = &cfg.source.sheet_id
        && sheet_id.trim().is_empty()
    {
        return Err(anyhow!("invalid sheet id: cannot be empty"));
    }
    cfg.timezone()?;
    if cfg.summarizer.model.trim().is_empty() {
        return Err(anyhow!("invalid summarizer model: cannot be empty"));
    }
    if cfg.summarizer.timeout_secs == 0 {
        return Err(anyhow!("invalid summarizer timeout: must be >= 1 second"));
    }
    Ok(())
}

fn parse_config_file(raw: &str, path: &Path) -> Result<ReadingConfig> {
    toml::from_str(raw)
        .map_err(|err| anyhow!("failed to parse reading config {}: {err}", path.display()))
}

fn load_file_config(path: &Path) -> Result<ReadingConfig> {
    if !path.exists() {
        return Ok(ReadingConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| anyhow!("failed to read reading config {}: {err}", path.display()))?;
    parse_config_file(&raw, path)
}

pub fn load_config(paths: &ReadingPaths) -> Result<ReadingConfig> {
    let mut cfg = load_file_config(&paths.config_file)?;

    if let Some(sheet_id) = env_non_empty("SHEET_ID") {
        cfg.source.sheet_id = Some(sheet_id);
    }
    cfg.source.range = env_or_string("READING_SHEET_RANGE", &cfg.source.range);
    if let Some(rows_file) = env_non_empty("READING_ROWS_FILE") {
        cfg.source.rows_file = Some(PathBuf::from(rows_file));
    }
    cfg.parse.mode = env_or_parsed("READING_PARSE_MODE", cfg.parse.mode)?;
    cfg.snapshot.timezone = env_or_string("READING_TIMEZONE", &cfg.snapshot.timezone);
    cfg.summarizer.provider = env_or_parsed("READING_SUMMARIZER", cfg.summarizer.provider)?;
    cfg.summarizer.model = env_or_string("READING_GEMINI_MODEL", &cfg.summarizer.model);
    cfg.summarizer.timeout_secs =
        env_or_u64("READING_SUMMARY_TIMEOUT_SECS", cfg.summarizer.timeout_secs);

    validate(&cfg)?;
    Ok(cfg)
}
