use crate::error::{MetricsError, RowError};
use crate::metrics::normalize::normalize_source_name;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

pub type RawRow = Vec<Value>;

const ROW_FIELDS: usize = 5;
const READ_FLAG: &str = "TRUE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArticle {
    pub date: NaiveDate,
    pub title: String,
    pub url: String,
    pub category: String,
    pub is_read: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    #[default]
    Skip,
    Strict,
}

impl ParsePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Strict => "strict",
        }
    }
}

impl FromStr for ParsePolicy {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "skip" | "lenient" => Ok(Self::Skip),
            "strict" => Ok(Self::Strict),
            other => Err(anyhow::anyhow!(
                "invalid parse mode `{other}`: use `skip` or `strict`"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub index: usize,
    pub error: RowError,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub articles: Vec<ParsedArticle>,
    pub rejected: Vec<RowRejection>,
}

fn field_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub fn parse_row(row: &[Value]) -> Result<ParsedArticle, RowError> {
    if row.len() < ROW_FIELDS {
        return Err(RowError::IncompleteRow { found: row.len() });
    }

    let raw_date = field_text(&row[0]);
    let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| RowError::InvalidDate { value: raw_date })?;

    Ok(ParsedArticle {
        date,
        title: field_text(&row[1]),
        url: field_text(&row[2]),
        category: normalize_source_name(&field_text(&row[3])),
        is_read: field_text(&row[4]) == READ_FLAG,
    })
}

pub fn parse_rows(rows: &[RawRow], policy: ParsePolicy) -> Result<ParsedBatch, MetricsError> {
    let mut batch = ParsedBatch::default();
    for (index, row) in rows.iter().enumerate() {
        match parse_row(row) {
            Ok(article) => batch.articles.push(article),
            Err(source) if policy == ParsePolicy::Strict => {
                return Err(MetricsError::Row { index, source });
            }
            Err(error) => {
                tracing::warn!(stage = "parse", index, %error, "skipping row");
                batch.rejected.push(RowRejection { index, error });
            }
        }
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(values: &[&str]) -> RawRow {
        values.iter().map(|v| json!(v)).collect()
    }

    #[test]
    fn parses_unread_article() {
        let got = parse_row(&row(&[
            "2025-11-28",
            "Article Title",
            "https://example.com",
            "Substack",
            "FALSE",
        ]))
        .expect("parse");
        assert_eq!(got.date.format("%Y-%m-%d").to_string(), "2025-11-28");
        assert_eq!(got.category, "Substack");
        assert_eq!(got.title, "Article Title");
        assert_eq!(got.url, "https://example.com");
        assert!(!got.is_read);
    }

    #[test]
    fn parses_read_article_and_normalizes_source() {
        let got = parse_row(&row(&["2025-11-26", "Article", "u", "freecodecamp", "TRUE"]))
            .expect("parse");
        assert_eq!(got.category, "freeCodeCamp");
        assert!(got.is_read);
    }

    #[test]
    fn read_flag_is_case_sensitive_and_permissive() {
        for flag in ["true", "True", "", "yes", "1", " TRUE"] {
            let got = parse_row(&row(&["2025-01-01", "t", "u", "s", flag])).expect("parse");
            assert!(!got.is_read, "flag={flag:?}");
        }
        let boolean = vec![json!("2025-01-01"), json!("t"), json!("u"), json!("s"), json!(true)];
        assert!(!parse_row(&boolean).expect("parse").is_read);
    }

    #[test]
    fn short_row_is_incomplete() {
        let err = parse_row(&row(&["2025-11-28", "Title"])).expect_err("should fail");
        assert_eq!(err, RowError::IncompleteRow { found: 2 });
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = parse_row(&row(&["invalid-date", "Title", "u", "Substack", "FALSE"]))
            .expect_err("should fail");
        assert_eq!(
            err,
            RowError::InvalidDate {
                value: "invalid-date".into()
            }
        );

        let err = parse_row(&row(&["2025-02-30", "Title", "u", "Substack", "FALSE"]))
            .expect_err("should fail");
        assert!(matches!(err, RowError::InvalidDate { .. }));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let got = parse_row(&row(&["2025-03-04", "t", "u", "GitHub", "TRUE", "extra"]))
            .expect("parse");
        assert_eq!(got.category, "GitHub");
    }

    #[test]
    fn skip_policy_collects_rejections() {
        let rows = vec![
            row(&["2025-11-28", "T1", "u1", "Substack", "FALSE"]),
            row(&["2025-11-27", "T2"]),
            row(&["2025-11-26", "T3", "u3", "github", "TRUE"]),
            row(&["nope", "T4", "u4", "stripe", "TRUE"]),
        ];
        let batch = parse_rows(&rows, ParsePolicy::Skip).expect("skip never fails");
        assert_eq!(batch.articles.len(), 2);
        assert_eq!(batch.rejected.len(), 2);
        assert_eq!(batch.rejected[0].index, 1);
        assert_eq!(batch.rejected[1].index, 3);
    }

    #[test]
    fn strict_policy_fails_on_first_bad_row() {
        let rows = vec![
            row(&["2025-11-28", "T1", "u1", "Substack", "FALSE"]),
            row(&["bad", "T2", "u2", "Substack", "FALSE"]),
            row(&["2025-11-26"]),
        ];
        let err = parse_rows(&rows, ParsePolicy::Strict).expect_err("strict fails");
        match err {
            MetricsError::Row { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(source, RowError::InvalidDate { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn parse_policy_from_str() {
        assert_eq!("STRICT".parse::<ParsePolicy>().expect("parse"), ParsePolicy::Strict);
        assert_eq!("skip".parse::<ParsePolicy>().expect("parse"), ParsePolicy::Skip);
        assert!("abort".parse::<ParsePolicy>().is_err());
    }
}
