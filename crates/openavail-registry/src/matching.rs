//! Title similarity scoring.

use std::collections::HashSet;

/// Alphanumeric tokens of length 3 or more, lowercased.
pub fn tokenize(title: &str) -> HashSet<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity over title tokens, in [0, 1].
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_titles_score_one() {
        let t = "Pollinator diversity shapes plant fitness";
        assert!((title_similarity(t, t) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        let a = "Pollinator Diversity: shapes plant fitness!";
        let b = "pollinator diversity shapes plant fitness";
        assert!((title_similarity(a, b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn short_tokens_are_dropped() {
        let tokens = tokenize("An ox in a lab of DNA");
        assert!(tokens.contains("lab"));
        assert!(tokens.contains("dna"));
        assert!(!tokens.contains("an"));
        assert!(!tokens.contains("ox"));
    }

    #[test]
    fn disjoint_titles_score_zero() {
        assert_eq!(title_similarity("beetle genomics", "ocean currents model"), 0.0);
    }
}
