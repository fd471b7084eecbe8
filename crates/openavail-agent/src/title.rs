//! Heuristic title resolution from first-page front matter.

use once_cell::sync::Lazy;
use regex::Regex;

use openavail_normalizer::ParagraphBlock;

static AFFILIATION_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(author|affiliation|department|correspondence|university|institute)\b")
        .unwrap()
});

static STOP_WORDS: &[&str] = &[
    "abstract",
    "introduction",
    "copyright",
    "license",
    "doi",
    "keywords",
];

#[derive(Debug, Clone)]
pub struct TitleCandidate {
    pub title: String,
    pub confidence: f64,
}

/// Resolve a title from the first page's first column: collect lines up to
/// the first affiliation/author cue, then try the single line, a
/// colon-joined pair, and 2-4 line space-joined merges, in decreasing
/// confidence order.
pub fn resolve_title(blocks: &[ParagraphBlock]) -> Option<TitleCandidate> {
    let lines: Vec<&str> = blocks
        .iter()
        .filter(|b| b.page == 1 && b.column == 0)
        .take(8)
        .map(|b| b.text.as_str())
        .take_while(|line| !AFFILIATION_CUE.is_match(line))
        .collect();
    if lines.is_empty() {
        return None;
    }

    if plausible_title(lines[0]) {
        return Some(TitleCandidate {
            title: lines[0].trim().to_string(),
            confidence: 0.6,
        });
    }

    if lines.len() >= 2 {
        let colon_joined = format!("{}: {}", lines[0].trim_end_matches(':'), lines[1]);
        if plausible_title(&colon_joined) {
            return Some(TitleCandidate {
                title: colon_joined,
                confidence: 0.56,
            });
        }
    }

    for take in 2..=4.min(lines.len()) {
        let merged = lines[..take].join(" ");
        if plausible_title(&merged) {
            let confidence = if take == 2 { 0.54 } else { 0.5 };
            return Some(TitleCandidate {
                title: merged,
                confidence,
            });
        }
    }
    None
}

/// Reject candidates that are too short or long, open with a section stop
/// word, have an implausible word count, or are mostly non-letters.
pub fn plausible_title(candidate: &str) -> bool {
    let text = candidate.trim();
    if text.len() < 8 || text.len() > 240 {
        return false;
    }
    let lower = text.to_lowercase();
    if STOP_WORDS.iter().any(|w| lower.starts_with(w) || lower.contains(&format!(" {w}"))) {
        return false;
    }
    let words = text.split_whitespace().count();
    if !(2..=45).contains(&words) {
        return false;
    }
    let letters = text.chars().filter(|c| c.is_alphabetic()).count();
    letters * 2 >= text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(text: &str, page: u32, column: u32, sequence: u32) -> ParagraphBlock {
        ParagraphBlock {
            text: text.into(),
            page,
            column,
            sequence,
        }
    }

    #[test]
    fn single_line_title_wins() {
        let blocks = vec![
            block("Pollinator diversity shapes plant fitness in fragmented meadows", 1, 0, 0),
            block("Jane Doe, University of Somewhere, Department of Ecology", 1, 0, 1),
        ];
        let t = resolve_title(&blocks).unwrap();
        assert!(t.title.starts_with("Pollinator diversity"));
        assert!((t.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn affiliation_cue_bounds_the_search() {
        let blocks = vec![
            block("Department of Biology", 1, 0, 0),
            block("A perfectly fine looking title would be here", 1, 0, 1),
        ];
        // The cue hits on the first line, so nothing is collected.
        assert!(resolve_title(&blocks).is_none());
    }

    #[test]
    fn short_fragments_merge_into_a_title() {
        let blocks = vec![
            block("Rangeticks", 1, 0, 0),
            block("expansion of winter ticks under climate warming scenarios", 1, 0, 1),
            block("Alice Smith, Institute of Zoology", 1, 0, 2),
        ];
        let t = resolve_title(&blocks).unwrap();
        assert!(t.title.contains("climate warming"));
        assert!(t.confidence < 0.6);
    }

    #[test]
    fn section_words_disqualify_candidates() {
        assert!(!plausible_title("Abstract of the study"));
        assert!(!plausible_title("Keywords density dependence"));
        assert!(!plausible_title("short"));
        assert!(!plausible_title("12345 67890 13579 24680 11111"));
    }

    #[test]
    fn second_column_is_ignored() {
        let blocks = vec![block("Right column text that is not a title", 1, 1, 0)];
        assert!(resolve_title(&blocks).is_none());
    }
}
