use crate::metrics::row::RawRow;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct RowBatch {
    pub rows: Vec<RawRow>,
    pub substack_author_count: Option<u64>,
}

pub trait RowSource {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<RowBatch>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowsPayload {
    Bare(Vec<RawRow>),
    Values {
        #[serde(default)]
        values: Vec<RawRow>,
        #[serde(default, rename = "substackAuthorCount")]
        substack_author_count: Option<u64>,
    },
}

pub fn decode_rows(raw: &str) -> Result<RowBatch> {
    let payload: RowsPayload =
        serde_json::from_str(raw).context("rows payload is neither an array nor {\"values\": [...]}")?;
    Ok(match payload {
        RowsPayload::Bare(rows) => RowBatch {
            rows,
            substack_author_count: None,
        },
        RowsPayload::Values {
            values,
            substack_author_count,
        } => RowBatch {
            rows: values,
            substack_author_count,
        },
    })
}

#[derive(Debug, Clone)]
pub struct RowsFile {
    pub path: PathBuf,
}

impl RowSource for RowsFile {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    fn fetch(&self) -> Result<RowBatch> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read rows file {}", self.path.display()))?;
        decode_rows(&raw).with_context(|| format!("failed to parse {}", self.path.display()))
    }
}
