//! Scoring policies and stable ranking.

use std::cmp::Reverse;

use chrono::NaiveDate;
use dailypaper_shared::{DailyWeights, Record, WeeklyWeights};
use serde::Serialize;

/// How records are scored.
#[derive(Debug, Clone)]
pub enum ScoringPolicy {
    /// Priority, tracked author, primary topic and recency bonuses.
    Daily(DailyWeights),
    /// Weighted keyword matches in title and summary plus a code bonus.
    Weekly(WeeklyWeights),
}

/// A record paired with the score the ranker gave it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    #[serde(flatten)]
    pub record: Record,
    pub score: i64,
}

/// Score one record. Missing fields contribute nothing.
pub fn score(record: &Record, policy: &ScoringPolicy, today: NaiveDate) -> i64 {
    match policy {
        ScoringPolicy::Daily(w) => daily_score(record, w, today),
        ScoringPolicy::Weekly(w) => weekly_score(record, w),
    }
}

fn daily_score(record: &Record, w: &DailyWeights, today: NaiveDate) -> i64 {
    let mut total = 0;
    if record.is_priority() {
        total += w.priority;
    }
    if record.tracked_author.as_deref().is_some_and(|a| !a.is_empty()) {
        total += w.tracked_author;
    }
    if let Some(topic) = record.primary_topic() {
        total += w
            .topic_bonus
            .iter()
            .find(|b| b.topic == topic)
            .map_or(0, |b| b.bonus);
    }
    // Future dates count as recent.
    if record
        .published
        .is_some_and(|d| (today - d).num_days() <= w.recency_days)
    {
        total += w.recency_bonus;
    }
    total
}

fn weekly_score(record: &Record, w: &WeeklyWeights) -> i64 {
    let title = record.title.to_lowercase();
    let summary = record.summary.to_lowercase();

    let mut total = 0;
    for kw in &w.keywords {
        let needle = kw.keyword.to_lowercase();
        if title.contains(&needle) {
            total += 2 * kw.weight;
        }
        if summary.contains(&needle) {
            total += kw.weight;
        }
    }
    if summary.contains("github.com") || summary.contains("code") {
        total += w.code_bonus;
    }
    total
}

/// Score every record and sort by score, highest first. Ties keep input order.
pub fn rank(records: Vec<Record>, policy: &ScoringPolicy, today: NaiveDate) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = records
        .into_iter()
        .map(|record| {
            let score = score(&record, policy, today);
            Ranked { record, score }
        })
        .collect();
    ranked.sort_by_key(|r| Reverse(r.score));
    ranked
}

/// Stable descending sort by an arbitrary key.
pub fn rank_by<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| Reverse(key(item)));
    items
}

/// Candidate ordering for the arXiv step: priority first, then total keyword hits.
pub fn triage_key(record: &Record) -> (u32, u32) {
    let priority = if record.is_priority() { 10 } else { 0 };
    (priority, record.relevance().counts().total())
}

/// Keep the first `n` items.
pub fn select_top<T>(mut items: Vec<T>, n: usize) -> Vec<T> {
    items.truncate(n);
    items
}
