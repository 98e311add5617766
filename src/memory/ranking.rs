//! Score fusion for search candidates.
//!
//! `score = 0.60 * lexical + 0.25 * recency + 0.15 * importance`, where recency
//! decays exponentially with a 14 day time constant and importance is `imp / 5`.

use chrono::{DateTime, Utc};

use super::search::SearchCandidate;
use super::types::SearchResult;

pub const LEXICAL_WEIGHT: f64 = 0.60;
pub const RECENCY_WEIGHT: f64 = 0.25;
pub const IMPORTANCE_WEIGHT: f64 = 0.15;

const RECENCY_TAU_DAYS: f64 = 14.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// `exp(-age_days / 14)`; entries created at or after `now` score 1.0.
pub fn recency_score(now: DateTime<Utc>, created_at: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY;
    if age_days <= 0.0 {
        return 1.0;
    }
    (-age_days / RECENCY_TAU_DAYS).exp()
}

pub fn importance_score(importance: i64) -> f64 {
    importance as f64 / 5.0
}

pub fn fuse(lexical: f64, recency: f64, importance: f64) -> f64 {
    LEXICAL_WEIGHT * lexical + RECENCY_WEIGHT * recency + IMPORTANCE_WEIGHT * importance
}

/// Score every candidate and keep the best `k`, highest score first.
///
/// The sort is stable: equal scores keep their candidate order. Metadata is
/// stripped from the records unless `include_metadata` is set.
pub fn rank(
    candidates: Vec<SearchCandidate>,
    now: DateTime<Utc>,
    k: usize,
    include_metadata: bool,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = candidates
        .into_iter()
        .map(|mut c| {
            if !include_metadata {
                c.entry.metadata = None;
            }
            let recency = recency_score(now, c.entry.created_at);
            let importance = importance_score(c.entry.importance);
            SearchResult {
                score: fuse(c.lexical_score, recency, importance),
                lexical_score: c.lexical_score,
                recency_score: recency,
                importance_score: importance,
                record: c.entry,
            }
        })
        .collect();

    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(k);
    results
}
