use crate::metrics::ingest::{RowBatch, RowSource, decode_rows};
use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::blocking::Client;
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct SheetsSource {
    pub sheet_id: String,
    pub range: String,
    pub api_key: String,
    pub base_url: String,
}

fn env_non_empty(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

impl SheetsSource {
    pub fn from_env(sheet_id: &str, range: &str) -> Result<Self> {
        let api_key = env_non_empty("SHEETS_API_KEY")
            .context("SHEETS_API_KEY environment variable is required to read from Google Sheets")?;
        let base_url =
            env_non_empty("READING_SHEETS_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            sheet_id: sheet_id.to_string(),
            range: range.to_string(),
            api_key,
            base_url,
        })
    }

    fn values_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid sheets base url `{}`", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("sheets base url cannot carry a path"))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.sheet_id.as_str(), "values", self.range.as_str()]);
        url.query_pairs_mut().append_pair("majorDimension", "ROWS");
        Ok(url)
    }
}

impl RowSource for SheetsSource {
    fn describe(&self) -> String {
        format!("sheets:{}!{}", self.sheet_id, self.range)
    }

    fn fetch(&self) -> Result<RowBatch> {
        let url = self.values_url()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        // The key travels in a header and reqwest errors drop the URL, so
        // neither reaches reports or the audit log.
        let response = client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .map_err(reqwest::Error::without_url)
            .context("unable to retrieve data from sheet")?;
        if !response.status().is_success() {
            anyhow::bail!("sheets call failed with status {}", response.status());
        }
        let body = response
            .text()
            .map_err(reqwest::Error::without_url)
            .context("failed to read sheets response")?;
        let batch = decode_rows(&body).context("sheets response missing `values`")?;
        tracing::info!(
            stage = "fetch",
            source = %self.describe(),
            rows = batch.rows.len(),
            "fetched rows from sheet"
        );
        Ok(batch)
    }
}
