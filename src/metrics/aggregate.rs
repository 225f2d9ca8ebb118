use crate::metrics::row::ParsedArticle;
use crate::metrics::snapshot::MetricsSnapshot;
use crate::metrics::velocity::months_spanned;
use chrono::{DateTime, Datelike, Utc};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn aggregate(articles: &[ParsedArticle], now: DateTime<Utc>) -> MetricsSnapshot {
    let mut snapshot = MetricsSnapshot {
        last_updated: now,
        ..MetricsSnapshot::default()
    };

    let mut date_range = None;
    for article in articles {
        snapshot.total_articles += 1;
        if article.is_read {
            snapshot.read_count += 1;
        } else {
            snapshot.unread_count += 1;
        }

        let source = article.category.as_str();
        *snapshot.by_source.entry(source.to_string()).or_default() += 1;
        let split = snapshot
            .by_source_read_status
            .entry(source.to_string())
            .or_default();
        if article.is_read {
            split.read += 1;
        } else {
            split.unread += 1;
        }

        let year = format!("{:04}", article.date.year());
        let month = format!("{:02}", article.date.month());
        *snapshot.by_year.entry(year.clone()).or_default() += 1;
        *snapshot
            .by_month
            .entry(format!("{year}-{month}"))
            .or_default() += 1;
        *snapshot
            .by_year_and_month
            .entry(year)
            .or_default()
            .entry(month.clone())
            .or_default() += 1;
        *snapshot.by_month_only.entry(month.clone()).or_default() += 1;
        *snapshot
            .by_month_and_source
            .entry(month)
            .or_default()
            .entry(source.to_string())
            .or_default() += 1;

        date_range = match date_range {
            None => Some((article.date, article.date)),
            Some((earliest, latest)) => Some((earliest.min(article.date), latest.max(article.date))),
        };
    }

    if snapshot.total_articles > 0 {
        snapshot.read_rate =
            round2(snapshot.read_count as f64 / snapshot.total_articles as f64 * 100.0);
    }
    if let Some((earliest, latest)) = date_range {
        let months = months_spanned(earliest, latest);
        snapshot.avg_articles_per_month =
            round2(snapshot.total_articles as f64 / f64::from(months));
    }

    tracing::debug!(
        stage = "aggregate",
        total = snapshot.total_articles,
        sources = snapshot.by_source.len(),
        "aggregated articles"
    );
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::row::{ParsePolicy, parse_rows};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 21, 10, 30, 0).single().expect("time")
    }

    fn article(date: &str, source: &str, is_read: bool) -> ParsedArticle {
        ParsedArticle {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").expect("date"),
            title: format!("title {date}"),
            url: format!("https://example.com/{date}"),
            category: source.to_string(),
            is_read,
        }
    }

    #[test]
    fn three_row_scenario_matches_expected_snapshot() {
        let rows = vec![
            vec![json!("2025-11-28"), json!("T1"), json!("u1"), json!("Substack"), json!("FALSE")],
            vec![json!("2025-11-27"), json!("T2"), json!("u2"), json!("GitHub"), json!("TRUE")],
            vec![json!("2025-11-26"), json!("T3"), json!("u3"), json!("freecodecamp"), json!("TRUE")],
        ];
        let batch = parse_rows(&rows, ParsePolicy::Strict).expect("parse");
        let snapshot = aggregate(&batch.articles, now());

        assert_eq!(snapshot.total_articles, 3);
        assert_eq!(snapshot.read_count, 2);
        assert_eq!(snapshot.unread_count, 1);
        assert_eq!(snapshot.read_rate, 66.67);
        assert_eq!(snapshot.by_source.get("Substack"), Some(&1));
        assert_eq!(snapshot.by_source.get("GitHub"), Some(&1));
        assert_eq!(snapshot.by_source.get("freeCodeCamp"), Some(&1));
        assert_eq!(snapshot.by_source.len(), 3);
        assert_eq!(snapshot.avg_articles_per_month, 3.0);
        assert_eq!(snapshot.last_updated, now());
        assert_eq!(snapshot.ai_summary, "");
        assert_eq!(snapshot.ai_delta_analysis, "");
        assert!(snapshot.invariant_violations().is_empty());
    }

    #[test]
    fn empty_batch_has_zero_rates() {
        let snapshot = aggregate(&[], now());
        assert_eq!(snapshot.total_articles, 0);
        assert_eq!(snapshot.read_rate, 0.0);
        assert_eq!(snapshot.avg_articles_per_month, 0.0);
        assert!(snapshot.by_source.is_empty());
        assert!(snapshot.invariant_violations().is_empty());
    }

    #[test]
    fn breakdowns_fill_every_bucket() {
        let articles = vec![
            article("2024-01-10", "Substack", true),
            article("2024-03-02", "GitHub", false),
            article("2025-01-15", "Substack", false),
            article("2025-01-20", "medium", true),
            article("2025-06-01", "Substack", true),
        ];
        let snapshot = aggregate(&articles, now());

        assert_eq!(snapshot.by_year.get("2024"), Some(&2));
        assert_eq!(snapshot.by_year.get("2025"), Some(&3));
        assert_eq!(snapshot.by_month.get("2025-01"), Some(&2));
        assert_eq!(snapshot.by_year_and_month["2025"].get("06"), Some(&1));
        assert_eq!(snapshot.by_year_and_month["2024"].get("03"), Some(&1));
        assert_eq!(snapshot.by_month_only.get("01"), Some(&3));
        assert_eq!(snapshot.by_month_and_source["01"].get("Substack"), Some(&2));
        assert_eq!(snapshot.by_month_and_source["01"].get("medium"), Some(&1));
        assert_eq!(snapshot.by_source_read_status["Substack"].read, 2);
        assert_eq!(snapshot.by_source_read_status["Substack"].unread, 1);
        assert_eq!(snapshot.read_rate, 60.0);
        // 2024-01 .. 2025-06 spans 17 months.
        assert_eq!(snapshot.avg_articles_per_month, round2(5.0 / 17.0));
        assert!(snapshot.invariant_violations().is_empty());
    }

    #[test]
    fn unordered_input_uses_true_date_range() {
        let articles = vec![
            article("2025-06-01", "a", true),
            article("2025-01-01", "b", true),
            article("2025-03-01", "c", true),
        ];
        let snapshot = aggregate(&articles, now());
        assert_eq!(snapshot.avg_articles_per_month, 0.6);
    }

    #[test]
    fn totals_match_batch_length_for_generated_batches() {
        let sources = ["Substack", "GitHub", "medium", "Stripe"];
        for size in [1usize, 7, 31, 120] {
            let articles: Vec<ParsedArticle> = (0..size)
                .map(|i| {
                    let date = NaiveDate::from_ymd_opt(2022 + (i % 3) as i32, 1 + (i % 12) as u32, 1 + (i % 28) as u32)
                        .expect("date");
                    ParsedArticle {
                        date,
                        title: String::new(),
                        url: String::new(),
                        category: sources[i % sources.len()].to_string(),
                        is_read: i % 3 == 0,
                    }
                })
                .collect();
            let snapshot = aggregate(&articles, now());
            assert_eq!(snapshot.total_articles as usize, size);
            assert!(
                snapshot.invariant_violations().is_empty(),
                "{:?}",
                snapshot.invariant_violations()
            );
        }
    }

    #[test]
    fn source_labelled_with_counter_key_survives_attached_counter() {
        let articles = vec![
            article("2025-11-01", "substack_author_count", true),
            article("2025-11-02", "substack_author_count", false),
        ];
        let snapshot = aggregate(&articles, now());
        assert_eq!(snapshot.substack_author_count(), None);

        let snapshot = snapshot.with_substack_author_count(7);
        assert_eq!(snapshot.substack_author_count(), None);
        assert!(
            snapshot.invariant_violations().is_empty(),
            "{:?}",
            snapshot.invariant_violations()
        );
    }
}
