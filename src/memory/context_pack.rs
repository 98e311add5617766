//! Token-budgeted context pack assembly.
//!
//! Results arrive in rank order. Each surviving entry becomes one line
//! `- [id] text`, and assembly stops at the first line that would overflow the
//! budget. Near-duplicate texts are skipped before that check.

use std::collections::HashSet;

use super::types::{truncate_chars, ContextPack, SearchResult};

/// Characters per estimated token.
const CHARS_PER_TOKEN: usize = 4;
/// Body text is truncated to this many characters per line.
const LINE_TEXT_LIMIT: usize = 300;
/// Normalized dedup keys are truncated to this many characters.
const DEDUP_KEY_LIMIT: usize = 180;

/// Lowercase, collapse whitespace runs to one space, trim, then truncate to
/// 180 chars with a `...` marker.
pub fn normalize_text(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    truncate_chars(&collapsed, DEDUP_KEY_LIMIT)
}

/// `ceil(chars / 4)`, never below 1.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN).max(1)
}

pub fn assemble(results: &[SearchResult], token_budget: usize) -> ContextPack {
    let mut seen: HashSet<String> = HashSet::new();
    let mut lines: Vec<String> = Vec::new();
    let mut memory_ids: Vec<String> = Vec::new();
    let mut used = 0usize;

    for result in results {
        let record = &result.record;
        let text = match record.summary.trim() {
            "" => record.content.trim(),
            summary => summary,
        };
        if text.is_empty() {
            continue;
        }

        if !seen.insert(normalize_text(text)) {
            continue;
        }

        let line = format!("- [{}] {}", record.id, truncate_chars(text, LINE_TEXT_LIMIT));
        let cost = estimate_tokens(&line);
        if used + cost > token_budget {
            break;
        }
        used += cost;
        lines.push(line);
        memory_ids.push(record.id.clone());
    }

    ContextPack {
        text: lines.join("\n"),
        estimated_tokens: used,
        memory_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::types::{MemoryEntry, Scope};
    use chrono::Utc;

    fn result(id: &str, summary: &str, content: &str) -> SearchResult {
        let now = Utc::now();
        SearchResult {
            record: MemoryEntry {
                id: id.into(),
                namespace: "a/b".into(),
                scope: Scope::Long,
                content: content.into(),
                summary: summary.into(),
                importance: 3,
                source_agent: None,
                metadata: None,
                created_at: now,
                last_accessed_at: now,
                expires_at: None,
                promoted_at: None,
            },
            score: 0.5,
            lexical_score: 0.5,
            recency_score: 1.0,
            importance_score: 0.6,
        }
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Hello\n\tWORLD  again "), "hello world again");
        let long = normalize_text(&"x".repeat(500));
        assert_eq!(long.chars().count(), 180);
        assert!(long.ends_with("..."));
        // Only the first 177 characters decide the key.
        let tail_a = normalize_text(&format!("{}{}", "X".repeat(177), "a".repeat(50)));
        let tail_b = normalize_text(&format!("{}{}", "x".repeat(177), "b".repeat(50)));
        assert_eq!(tail_a, long);
        assert_eq!(tail_b, long);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn duplicates_are_skipped() {
        let pack = assemble(
            &[
                result("a", "Deploy  the API", ""),
                result("b", "deploy the api", ""),
                result("c", "rollback plan", ""),
            ],
            1000,
        );
        assert_eq!(pack.memory_ids, vec!["a", "c"]);
        assert_eq!(pack.text, "- [a] Deploy  the API\n- [c] rollback plan");
    }

    #[test]
    fn stops_at_first_line_over_budget() {
        // "- [1] abcd" and "- [2] efgh" are 10 chars each: 3 tokens.
        let pack = assemble(&[result("1", "abcd", ""), result("2", "efgh", ""), result("3", "x", "")], 5);
        assert_eq!(pack.memory_ids, vec!["1"]);
        assert_eq!(pack.estimated_tokens, 3);
        assert_eq!(pack.text, "- [1] abcd");
    }

    #[test]
    fn zero_budget_yields_empty_pack() {
        let pack = assemble(&[result("1", "abcd", "")], 0);
        assert!(pack.text.is_empty());
        assert!(pack.memory_ids.is_empty());
        assert_eq!(pack.estimated_tokens, 0);
    }

    #[test]
    fn empty_summary_uses_content_and_long_text_is_truncated() {
        let long = "y".repeat(400);
        let pack = assemble(&[result("z", "", &long)], 10_000);
        let body = pack.text.strip_prefix("- [z] ").unwrap();
        assert_eq!(body.chars().count(), 300);
        assert!(body.ends_with("..."));
    }
}
