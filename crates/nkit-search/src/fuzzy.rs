//! Fuzzy ranking of databases against a search term.
//!
//! Scores are partial-ratio similarities in `0..=100`: the shorter string is
//! slid over the longer one and the best window similarity wins, so a term
//! that appears anywhere in a title scores 100. Both sides are normalized
//! first (lowercased, punctuation folded to spaces, trimmed).

use crate::directory::DatabaseSummary;

/// A ranked directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub database: &'a DatabaseSummary,
    pub score: u8,
}

fn normalize(s: &str) -> Vec<char> {
    let folded: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    folded.trim().chars().collect()
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0_usize; b.len() + 1];
    let mut cur = vec![0_usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Indel similarity `2·lcs / (|a| + |b|)`, as a fraction.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let r = (2 * lcs_len(a, b)) as f64 / total as f64;
    r
}

/// Best similarity of the shorter string against any equally long window of
/// the longer one, in `0..=100`. Empty input scores 0.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (a, b) = (normalize(a), normalize(b));
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }

    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        best = best.max(ratio(&short, window));
        if best >= 1.0 {
            break;
        }
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = (best * 100.0).round() as u8;
    score
}

/// Top `limit` databases for `term`, best first. Ties keep directory order.
#[must_use]
pub fn rank<'a>(term: &str, databases: &'a [DatabaseSummary], limit: usize) -> Vec<Match<'a>> {
    let mut matches: Vec<Match<'a>> = databases
        .iter()
        .map(|database| Match {
            database,
            score: partial_ratio(term, &database.search_text()),
        })
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ParentContext;
    use proptest::prelude::*;

    fn summary(id: &str, title: &str) -> DatabaseSummary {
        DatabaseSummary {
            id: id.to_string(),
            title: title.to_string(),
            context: ParentContext::Workspace,
            title_property: None,
            url: None,
        }
    }

    #[test]
    fn substring_scores_full() {
        assert_eq!(partial_ratio("task", "My Tasks (Workspace)"), 100);
        assert_eq!(partial_ratio("READING", "reading list"), 100);
    }

    #[test]
    fn unrelated_strings_score_low() {
        assert!(partial_ratio("zzzz", "Reading List") < 30);
    }

    #[test]
    fn empty_term_scores_zero() {
        assert_eq!(partial_ratio("", "Anything"), 0);
        assert_eq!(partial_ratio("  --  ", "Anything"), 0);
    }

    #[test]
    fn typo_still_ranks_first() {
        let dbs = [
            summary("1", "Groceries"),
            summary("2", "Project Tasks"),
            summary("3", "Journal"),
        ];
        let ranked = rank("projct", &dbs, 8);
        assert_eq!(ranked[0].database.id, "2");
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn rank_honors_limit() {
        let dbs: Vec<DatabaseSummary> = (0..12).map(|i| summary(&i.to_string(), "Notes")).collect();
        let ranked = rank("notes", &dbs, 8);
        assert_eq!(ranked.len(), 8);
        assert_eq!(ranked[0].database.id, "0");
    }

    proptest! {
        #[test]
        fn score_is_bounded_and_symmetric(a in "[a-zA-Z ]{0,12}", b in "[a-zA-Z ]{0,12}") {
            let ab = partial_ratio(&a, &b);
            prop_assert!(ab <= 100);
            prop_assert_eq!(ab, partial_ratio(&b, &a));
        }

        #[test]
        fn contained_term_scores_full(
            prefix in "[a-z]{0,6}",
            term in "[a-z]{1,6}",
            suffix in "[a-z]{0,6}"
        ) {
            let title = format!("{prefix}{term}{suffix}");
            prop_assert_eq!(partial_ratio(&term, &title), 100);
        }
    }
}
