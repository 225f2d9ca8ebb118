use crate::error::MetricsError;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::metrics::store::SnapshotStore;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DELTA_PLACEHOLDER: &str = "AI delta analysis unavailable at this time.";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";

pub trait Summarizer {
    fn provider(&self) -> &'static str;
    fn summarize(
        &self,
        current: &MetricsSnapshot,
        previous: Option<&MetricsSnapshot>,
    ) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerProvider {
    #[default]
    Auto,
    Gemini,
    Local,
    None,
}

impl SummarizerProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gemini => "gemini",
            Self::Local => "local",
            Self::None => "none",
        }
    }
}

impl FromStr for SummarizerProvider {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "gemini" | "google" => Ok(Self::Gemini),
            "local" | "offline" => Ok(Self::Local),
            "none" | "off" | "skip" => Ok(Self::None),
            other => Err(anyhow::anyhow!(
                "invalid summarizer `{other}`: use `auto`, `gemini`, `local`, or `none`"
            )),
        }
    }
}

pub struct GeminiSummarizer {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

pub struct LocalSummarizer;

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

pub fn build_summarizer(
    provider: SummarizerProvider,
    model: &str,
    timeout_secs: u64,
) -> Result<Option<Box<dyn Summarizer>>, MetricsError> {
    let gemini = |api_key: String| -> Box<dyn Summarizer> {
        Box::new(GeminiSummarizer {
            api_key,
            model: model.to_string(),
            base_url: env_non_empty("READING_GEMINI_BASE_URL")
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            timeout_secs,
        })
    };
    match provider {
        SummarizerProvider::None => Ok(None),
        SummarizerProvider::Local => Ok(Some(Box::new(LocalSummarizer))),
        SummarizerProvider::Auto => Ok(env_non_empty("GEMINI_API_KEY").map(gemini)),
        SummarizerProvider::Gemini => match env_non_empty("GEMINI_API_KEY") {
            Some(api_key) => Ok(Some(gemini(api_key))),
            None => Err(MetricsError::SummarizationUnavailable(
                "GEMINI_API_KEY environment variable not set".into(),
            )),
        },
    }
}

pub fn build_prompt(current: &MetricsSnapshot, previous: Option<&MetricsSnapshot>) -> Result<String> {
    let current_json = serde_json::to_string_pretty(current)?;
    let mut prompt = String::from(
        "You are a personal reading analytics assistant. Analyze the reader's habits.\n\n",
    );

    match previous {
        Some(previous) => {
            let previous_json = serde_json::to_string_pretty(previous)?;
            prompt.push_str("Compare the two reading metrics snapshots below (previous vs current).\n\n");
            prompt.push_str("PREVIOUS WEEK:\n");
            prompt.push_str(&previous_json);
            prompt.push_str("\n\nCURRENT WEEK:\n");
            prompt.push_str(&current_json);
            prompt.push_str("\n\n");
            prompt.push_str(
                "Write a concise qualitative delta analysis of the changes in 2-3 sentences. \
                 Cover three dimensions: velocity (changes in reading pace or read rate), \
                 backlog health (whether items older than one year are being cleared or new unread items are piling up), \
                 and chronology (which publication years were read this week). \
                 Do not name sources such as Substack; interpret the trends as a narrative. \
                 Keep an objective third-person voice without 'you' or 'your'. \
                 Reply in plain text only, with no markdown: no bold, italics, bullet points, or headers.",
            );
        }
        None => {
            prompt.push_str("Analyze the following reading metrics:\n\n");
            prompt.push_str(&current_json);
            prompt.push_str("\n\n");
            prompt.push_str(
                "Write a concise analysis of the reading profile in 2-3 sentences, \
                 covering reading velocity, how old the unread backlog is, and which era the collection comes from. \
                 Keep an objective third-person voice without 'you' or 'your'. \
                 Reply in plain text only, with no markdown formatting.",
            );
        }
    }
    Ok(prompt)
}

fn extract_gemini_text(json: &Value) -> Option<String> {
    let parts = json
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|v| v.get("content"))
        .and_then(|v| v.get("parts"))
        .and_then(Value::as_array)?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

impl Summarizer for GeminiSummarizer {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn summarize(
        &self,
        current: &MetricsSnapshot,
        previous: Option<&MetricsSnapshot>,
    ) -> Result<String> {
        let prompt = build_prompt(current, previous)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model,
        );
        let payload = serde_json::json!({
            "contents": [
                {
                    "parts": [
                        {"text": prompt}
                    ]
                }
            ]
        });

        let client = Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;
        let response = client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .map_err(reqwest::Error::without_url)
            .context("gemini request failed")?;
        if !response.status().is_success() {
            anyhow::bail!("gemini call failed with status {}", response.status());
        }
        let json: Value = response
            .json()
            .map_err(reqwest::Error::without_url)
            .context("gemini response was not JSON")?;
        extract_gemini_text(&json).context("no content returned from gemini")
    }
}

fn signed(delta: f64) -> String {
    if delta >= 0.0 {
        format!("+{delta:.2}")
    } else {
        format!("{delta:.2}")
    }
}

impl Summarizer for LocalSummarizer {
    fn provider(&self) -> &'static str {
        "local"
    }

    fn summarize(
        &self,
        current: &MetricsSnapshot,
        previous: Option<&MetricsSnapshot>,
    ) -> Result<String> {
        let newest_year = current.by_year.keys().next_back().map_or("n/a", String::as_str);
        let oldest_year = current.by_year.keys().next().map_or("n/a", String::as_str);

        let text = match previous {
            Some(previous) => {
                let added = current.total_articles as i64 - previous.total_articles as i64;
                let read_delta = current.read_count as i64 - previous.read_count as i64;
                format!(
                    "The log moved from {} to {} articles ({added:+}) while {read_delta:+} items were marked read. \
                     The read rate shifted from {:.2}% to {:.2}% ({} points) with {} items still unread. \
                     Velocity stands at {:.2} articles per month and the newest publication year on record is {newest_year}.",
                    previous.total_articles,
                    current.total_articles,
                    previous.read_rate,
                    current.read_rate,
                    signed(current.read_rate - previous.read_rate),
                    current.unread_count,
                    current.avg_articles_per_month,
                )
            }
            None => format!(
                "The collection holds {} articles with a {:.2}% read rate and {} items unread. \
                 Velocity stands at {:.2} articles per month across publication years {oldest_year} to {newest_year}.",
                current.total_articles,
                current.read_rate,
                current.unread_count,
                current.avg_articles_per_month,
            ),
        };
        Ok(text)
    }
}

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub filename: String,
    pub provider: String,
    pub had_previous: bool,
    pub used_placeholder: bool,
    pub snapshot: MetricsSnapshot,
}

/// Compare `current` with its predecessor, attach the resulting delta text,
/// and rewrite `filename`.
///
/// A missing predecessor means first run. A summarizer failure stores
/// `DELTA_PLACEHOLDER`. Only a failed write is returned as an error.
pub fn generate_delta_analysis(
    store: &SnapshotStore,
    filename: &str,
    current: &MetricsSnapshot,
    summarizer: &dyn Summarizer,
) -> Result<SummaryOutcome, MetricsError> {
    let previous = match store.find_previous(filename) {
        Ok(previous) => Some(previous),
        Err(err) => {
            tracing::warn!(
                stage = "summarize",
                filename,
                code = err.code(),
                %err,
                "could not load previous metrics for comparison"
            );
            None
        }
    };

    let (text, used_placeholder) = match summarizer.summarize(current, previous.as_ref()) {
        Ok(text) => (text.trim().to_string(), false),
        Err(err) => {
            let detail = format!("{err:#}");
            tracing::warn!(
                stage = "summarize",
                provider = summarizer.provider(),
                err = %detail,
                "delta analysis failed; storing placeholder"
            );
            (DELTA_PLACEHOLDER.to_string(), true)
        }
    };

    let snapshot = store.attach_summary_and_resave(filename, current, None, Some(&text))?;
    Ok(SummaryOutcome {
        filename: filename.to_string(),
        provider: summarizer.provider().to_string(),
        had_previous: previous.is_some(),
        used_placeholder,
        snapshot,
    })
}
