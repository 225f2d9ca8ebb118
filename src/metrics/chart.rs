use crate::metrics::snapshot::MetricsSnapshot;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const SUBSTACK: &str = "Substack";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub count: u64,
    pub read: u64,
    pub unread: u64,
    pub read_pct: f64,
    pub author_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearInfo {
    pub year: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSourceCount {
    pub source: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthInfo {
    pub name: String,
    pub month: String,
    pub total: u64,
    pub sources: Vec<MonthSourceCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearChartData {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthDataset {
    pub label: String,
    pub data: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<MonthDataset>,
    pub total_data: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub total_articles: u64,
    pub read_count: u64,
    pub unread_count: u64,
    pub read_rate: f64,
    pub avg_articles_per_month: f64,
    pub last_updated: DateTime<Utc>,
    pub ai_summary: String,
    pub ai_delta_analysis: String,
    pub sources: Vec<SourceInfo>,
    pub years: Vec<YearInfo>,
    pub months: Vec<MonthInfo>,
    pub year_chart: YearChartData,
    pub month_chart: MonthChartData,
}

pub fn rank_sources(snapshot: &MetricsSnapshot) -> Vec<SourceInfo> {
    let author_count = snapshot.substack_author_count().unwrap_or(0);
    let mut sources: Vec<SourceInfo> = snapshot
        .by_source
        .iter()
        .map(|(name, &count)| {
            let split = snapshot
                .by_source_read_status
                .get(name)
                .copied()
                .unwrap_or_default();
            let read_pct = if count > 0 {
                split.read as f64 / count as f64 * 100.0
            } else {
                0.0
            };
            SourceInfo {
                name: name.clone(),
                count,
                read: split.read,
                unread: split.unread,
                read_pct,
                author_count: if name == SUBSTACK { author_count } else { 0 },
            }
        })
        .collect();
    sources.sort_by(|a, b| b.count.cmp(&a.count));
    sources
}

pub fn year_listing(snapshot: &MetricsSnapshot) -> Vec<YearInfo> {
    snapshot
        .by_year
        .iter()
        .rev()
        .map(|(year, &count)| YearInfo {
            year: year.clone(),
            count,
        })
        .collect()
}

pub fn month_listing(snapshot: &MetricsSnapshot, ranked: &[SourceInfo]) -> Vec<MonthInfo> {
    let mut months = Vec::new();
    for (idx, name) in MONTH_NAMES.iter().enumerate() {
        let key = format!("{:02}", idx + 1);
        let total = snapshot.by_month_only.get(&key).copied().unwrap_or(0);
        if total == 0 {
            continue;
        }
        let empty = IndexMap::new();
        let per_source = snapshot.by_month_and_source.get(&key).unwrap_or(&empty);

        let mut sources: Vec<MonthSourceCount> = ranked
            .iter()
            .filter_map(|source| {
                per_source.get(&source.name).map(|&count| MonthSourceCount {
                    source: source.name.clone(),
                    count,
                })
            })
            .collect();
        for (source, &count) in per_source {
            if !ranked.iter().any(|r| &r.name == source) {
                sources.push(MonthSourceCount {
                    source: source.clone(),
                    count,
                });
            }
        }

        months.push(MonthInfo {
            name: (*name).to_string(),
            month: key,
            total,
            sources,
        });
    }
    months
}

pub fn year_chart(years: &[YearInfo]) -> YearChartData {
    let mut ascending: Vec<&YearInfo> = years.iter().collect();
    ascending.sort_by(|a, b| a.year.cmp(&b.year));
    YearChartData {
        labels: ascending.iter().map(|y| y.year.clone()).collect(),
        data: ascending.iter().map(|y| y.count).collect(),
    }
}

pub fn month_chart(months: &[MonthInfo], ranked: &[SourceInfo]) -> MonthChartData {
    let count_in = |month: &MonthInfo, source: &str| {
        month
            .sources
            .iter()
            .find(|entry| entry.source == source)
            .map_or(0, |entry| entry.count)
    };
    MonthChartData {
        labels: months.iter().map(|m| m.name.clone()).collect(),
        datasets: ranked
            .iter()
            .map(|source| MonthDataset {
                label: source.name.clone(),
                data: months.iter().map(|m| count_in(m, &source.name)).collect(),
            })
            .collect(),
        total_data: months.iter().map(|m| m.total).collect(),
    }
}

pub fn project(snapshot: &MetricsSnapshot) -> DashboardData {
    let sources = rank_sources(snapshot);
    let years = year_listing(snapshot);
    let months = month_listing(snapshot, &sources);
    let year_chart = year_chart(&years);
    let month_chart = month_chart(&months, &sources);

    DashboardData {
        total_articles: snapshot.total_articles,
        read_count: snapshot.read_count,
        unread_count: snapshot.unread_count,
        read_rate: snapshot.read_rate,
        avg_articles_per_month: snapshot.avg_articles_per_month,
        last_updated: snapshot.last_updated,
        ai_summary: snapshot.ai_summary.clone(),
        ai_delta_analysis: snapshot.ai_delta_analysis.clone(),
        sources,
        years,
        months,
        year_chart,
        month_chart,
    }
}
