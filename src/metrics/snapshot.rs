use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved `bySourceReadStatus` key carrying the Substack author count
/// supplied by the row source. It is not a source.
pub const SUBSTACK_AUTHOR_COUNT_KEY: &str = "substack_author_count";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[u64; 2]", into = "[u64; 2]")]
pub struct ReadStatus {
    pub read: u64,
    pub unread: u64,
}

impl ReadStatus {
    pub fn total(self) -> u64 {
        self.read + self.unread
    }
}

impl From<[u64; 2]> for ReadStatus {
    fn from([read, unread]: [u64; 2]) -> Self {
        Self { read, unread }
    }
}

impl From<ReadStatus> for [u64; 2] {
    fn from(status: ReadStatus) -> Self {
        [status.read, status.unread]
    }
}

/// One dated aggregation result. Persisted as `YYYY-MM-DD.json`.
///
/// `by_source` and `by_source_read_status` keep discovery order so ranking
/// ties resolve the same way before and after a save/load cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub total_articles: u64,
    pub read_count: u64,
    pub unread_count: u64,
    pub read_rate: f64,
    pub by_source: IndexMap<String, u64>,
    pub by_source_read_status: IndexMap<String, ReadStatus>,
    pub by_year: BTreeMap<String, u64>,
    pub by_month: BTreeMap<String, u64>,
    pub by_year_and_month: BTreeMap<String, BTreeMap<String, u64>>,
    pub by_month_only: BTreeMap<String, u64>,
    pub by_month_and_source: BTreeMap<String, IndexMap<String, u64>>,
    pub avg_articles_per_month: f64,
    pub last_updated: DateTime<Utc>,
    pub ai_summary: String,
    pub ai_delta_analysis: String,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            total_articles: 0,
            read_count: 0,
            unread_count: 0,
            read_rate: 0.0,
            by_source: IndexMap::new(),
            by_source_read_status: IndexMap::new(),
            by_year: BTreeMap::new(),
            by_month: BTreeMap::new(),
            by_year_and_month: BTreeMap::new(),
            by_month_only: BTreeMap::new(),
            by_month_and_source: BTreeMap::new(),
            avg_articles_per_month: 0.0,
            last_updated: DateTime::<Utc>::UNIX_EPOCH,
            ai_summary: String::new(),
            ai_delta_analysis: String::new(),
        }
    }
}

impl MetricsSnapshot {
    pub fn substack_author_count(&self) -> Option<u64> {
        if self.by_source.contains_key(SUBSTACK_AUTHOR_COUNT_KEY) {
            return None;
        }
        self.by_source_read_status
            .get(SUBSTACK_AUTHOR_COUNT_KEY)
            .map(|status| status.read)
    }

    pub fn with_substack_author_count(mut self, count: u64) -> Self {
        if self.by_source.contains_key(SUBSTACK_AUTHOR_COUNT_KEY) {
            tracing::warn!(
                stage = "aggregate",
                key = SUBSTACK_AUTHOR_COUNT_KEY,
                count,
                "a source already uses the author counter key; counter dropped"
            );
            return self;
        }
        self.by_source_read_status.insert(
            SUBSTACK_AUTHOR_COUNT_KEY.to_string(),
            ReadStatus {
                read: count,
                unread: 0,
            },
        );
        self
    }

    pub fn with_summary(&self, summary: Option<&str>, delta_analysis: Option<&str>) -> Self {
        let mut next = self.clone();
        if let Some(text) = summary {
            next.ai_summary = text.to_string();
        }
        if let Some(text) = delta_analysis {
            next.ai_delta_analysis = text.to_string();
        }
        next
    }

    pub fn invariant_violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        let total = self.total_articles;
        if self.read_count + self.unread_count != total {
            out.push(format!(
                "readCount + unreadCount = {} != totalArticles {total}",
                self.read_count + self.unread_count
            ));
        }
        let sums = [
            ("bySource", self.by_source.values().sum::<u64>()),
            ("byYear", self.by_year.values().sum::<u64>()),
            ("byMonth", self.by_month.values().sum::<u64>()),
        ];
        for (name, sum) in sums {
            if sum != total {
                out.push(format!("sum({name}) = {sum} != totalArticles {total}"));
            }
        }
        for (source, count) in &self.by_source {
            let split = self
                .by_source_read_status
                .get(source)
                .copied()
                .unwrap_or_default();
            if split.total() != *count {
                out.push(format!(
                    "bySourceReadStatus[{source}] = {} != bySource[{source}] {count}",
                    split.total()
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_status_serializes_as_pair() {
        let status = ReadStatus { read: 8, unread: 2 };
        assert_eq!(serde_json::to_string(&status).expect("json"), "[8,2]");
        let back: ReadStatus = serde_json::from_str("[3,4]").expect("parse");
        assert_eq!(back, ReadStatus { read: 3, unread: 4 });
    }

    #[test]
    fn missing_fields_default_and_unknown_fields_are_ignored() {
        let raw = r#"{"totalArticles": 4, "readCount": 1, "someFutureField": [1,2,3]}"#;
        let parsed: MetricsSnapshot = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.total_articles, 4);
        assert_eq!(parsed.read_count, 1);
        assert_eq!(parsed.unread_count, 0);
        assert!(parsed.by_source.is_empty());
        assert_eq!(parsed.ai_delta_analysis, "");
    }

    #[test]
    fn with_summary_leaves_original_untouched() {
        let original = MetricsSnapshot {
            ai_summary: "old summary".into(),
            ..MetricsSnapshot::default()
        };
        let next = original.with_summary(None, Some("delta"));
        assert_eq!(next.ai_summary, "old summary");
        assert_eq!(next.ai_delta_analysis, "delta");
        assert_eq!(original.ai_delta_analysis, "");
    }

    #[test]
    fn author_counter_is_not_a_source() {
        let snapshot = MetricsSnapshot::default().with_substack_author_count(12);
        assert_eq!(snapshot.substack_author_count(), Some(12));
        assert!(snapshot.by_source.is_empty());
        assert!(snapshot.invariant_violations().is_empty());
    }

    #[test]
    fn source_named_like_the_counter_keeps_its_split() {
        let mut snapshot = MetricsSnapshot {
            total_articles: 2,
            read_count: 1,
            unread_count: 1,
            ..MetricsSnapshot::default()
        };
        snapshot
            .by_source
            .insert(SUBSTACK_AUTHOR_COUNT_KEY.to_string(), 2);
        snapshot.by_source_read_status.insert(
            SUBSTACK_AUTHOR_COUNT_KEY.to_string(),
            ReadStatus { read: 1, unread: 1 },
        );
        snapshot.by_year.insert("2025".into(), 2);
        snapshot.by_month.insert("2025-11".into(), 2);
        assert_eq!(snapshot.substack_author_count(), None);

        let snapshot = snapshot.with_substack_author_count(7);
        assert_eq!(snapshot.substack_author_count(), None);
        assert_eq!(
            snapshot.by_source_read_status[SUBSTACK_AUTHOR_COUNT_KEY],
            ReadStatus { read: 1, unread: 1 }
        );
        assert!(snapshot.invariant_violations().is_empty());
    }
}
