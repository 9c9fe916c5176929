//! "Did you mean" suggestions for unbound names

/// Minimum similarity for a declared name to be offered as a suggestion
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Maximum number of suggestions attached to one diagnostic
pub const MAX_SUGGESTIONS: usize = 4;

/// Similarity ratio in `[0, 1]`: twice the longest common subsequence over
/// the combined length
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }

    2.0 * prev[b.len()] as f64 / total as f64
}

/// Declared names similar to `name`, best match first, ties in declaration order
pub fn suggestions<'a>(name: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut scored: Vec<(f64, usize, &str)> = candidates
        .into_iter()
        .enumerate()
        .map(|(order, candidate)| (similarity(name, candidate), order, candidate))
        .filter(|(score, _, candidate)| *score >= SIMILARITY_THRESHOLD && *candidate != name)
        .collect();

    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, _, candidate)| candidate.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_bounds() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("", ""), 1.0);
    }

    #[test]
    fn test_similarity_typo() {
        // "value" vs "valeu": common subsequence "vale" (4), 8 / 10
        assert!((similarity("value", "valeu") - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_suggestions_ranked_and_capped() {
        let names = ["count", "counts", "amount", "counter", "cont", "coun"];
        let found = suggestions("count1", names.iter().copied());
        assert!(found.len() <= MAX_SUGGESTIONS);
        assert_eq!(found.first().map(String::as_str), Some("count"));
        assert!(!found.contains(&"amount".to_string()));
    }
}
