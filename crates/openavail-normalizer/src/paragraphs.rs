//! Line and paragraph assembly from positioned words, plus the plain-text
//! fallback splitter for pages without geometry.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::NormalizerConfig;
use crate::geometry::Word;

static URL_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://\S*$").unwrap());
static URL_TAIL_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[=\-_/&?]$").unwrap());
static URL_CONTINUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-./?=&%#~+]+").unwrap());

/// Assemble one column's words into paragraph strings. Words on the same
/// baseline (within `line_merge_tolerance`) join into a line; lines whose
/// vertical gap exceeds `paragraph_gap` start a new paragraph. Lines broken
/// mid-URL are rejoined, and short heading lines ending in ':' merge into
/// the paragraph that follows them.
pub fn words_to_paragraphs(words: &[Word], config: &NormalizerConfig) -> Vec<String> {
    if words.is_empty() {
        return vec![];
    }

    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| {
        (a.top, a.x0)
            .partial_cmp(&(b.top, b.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Group into lines.
    struct Line {
        text: String,
        top: f64,
        bottom: f64,
    }
    let mut lines: Vec<Line> = Vec::new();
    for w in sorted {
        match lines.last_mut() {
            Some(line) if (w.top - line.top).abs() <= config.line_merge_tolerance => {
                if !line.text.is_empty() {
                    line.text.push(' ');
                }
                line.text.push_str(w.text.trim());
                line.bottom = line.bottom.max(w.bottom);
            }
            _ => lines.push(Line {
                text: w.text.trim().to_string(),
                top: w.top,
                bottom: w.bottom,
            }),
        }
    }

    // Group lines into paragraphs by vertical gap.
    let mut paragraphs: Vec<Vec<String>> = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut prev_bottom: Option<f64> = None;
    for line in lines {
        if line.text.is_empty() {
            continue;
        }
        if let Some(b) = prev_bottom {
            if line.top - b > config.paragraph_gap && !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        }
        current.push(line.text);
        prev_bottom = Some(line.bottom);
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    let mut joined: Vec<String> = paragraphs
        .into_iter()
        .map(|lines| join_lines(&lines))
        .filter(|p| !p.is_empty())
        .collect();
    merge_inline_headings(&mut joined, config.inline_heading_max_len);
    joined
}

/// Join a paragraph's lines into one string, rejoining URLs that the line
/// break split in two.
fn join_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(line);
            continue;
        }
        if URL_TAIL.is_match(&out) && looks_like_url_continuation(&out, line) {
            out.push_str(line);
        } else {
            out.push(' ');
            out.push_str(line);
        }
    }
    out
}

/// The next line continues a URL when the URL ends mid-path (`=`, `-`,
/// `_`, `/`, `&`, `?`) or the line's leading token itself looks like a
/// path segment. A plain word after a URL is prose, not a continuation.
fn looks_like_url_continuation(out: &str, line: &str) -> bool {
    let Some(m) = URL_CONTINUATION.find(line) else {
        return false;
    };
    URL_TAIL_HINT.is_match(out) || m.as_str().contains('/')
}

/// Fold short heading paragraphs ending in ':' into the paragraph after
/// them, so "Data availability:" stays attached to its statement.
fn merge_inline_headings(paragraphs: &mut Vec<String>, max_len: usize) {
    let mut i = 0;
    while i + 1 < paragraphs.len() {
        let is_heading = {
            let p = &paragraphs[i];
            p.len() < max_len && p.ends_with(':')
        };
        if is_heading {
            let next = paragraphs.remove(i + 1);
            let head = &mut paragraphs[i];
            head.push(' ');
            head.push_str(&next);
        }
        i += 1;
    }
}

/// Plain-text fallback: split on blank lines, collapse internal newlines.
pub fn split_simple(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|block| {
            block
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, x0: f64, top: f64) -> Word {
        Word {
            text: text.into(),
            x0,
            x1: x0 + text.len() as f64 * 5.0,
            top,
            bottom: top + 10.0,
        }
    }

    #[test]
    fn words_on_same_baseline_join_into_a_line() {
        let words = vec![word("All", 0.0, 100.0), word("data", 20.0, 101.0)];
        let paras = words_to_paragraphs(&words, &NormalizerConfig::default());
        assert_eq!(paras, vec!["All data"]);
    }

    #[test]
    fn large_vertical_gap_starts_new_paragraph() {
        let words = vec![
            word("first", 0.0, 100.0),
            word("second", 0.0, 112.0),
            word("third", 0.0, 140.0),
        ];
        let paras = words_to_paragraphs(&words, &NormalizerConfig::default());
        assert_eq!(paras, vec!["first second", "third"]);
    }

    #[test]
    fn broken_url_is_rejoined_across_lines() {
        let words = vec![
            word("See", 0.0, 100.0),
            word("https://zenodo.org/rec", 20.0, 100.0),
            word("ord/12345", 0.0, 112.0),
        ];
        let paras = words_to_paragraphs(&words, &NormalizerConfig::default());
        assert_eq!(paras, vec!["See https://zenodo.org/record/12345"]);
    }

    #[test]
    fn prose_after_a_url_is_not_glued_on() {
        let words = vec![
            word("at", 0.0, 100.0),
            word("https://osf.io/abcde", 15.0, 100.0),
            word("Further", 0.0, 112.0),
            word("details", 40.0, 112.0),
        ];
        let paras = words_to_paragraphs(&words, &NormalizerConfig::default());
        assert_eq!(paras, vec!["at https://osf.io/abcde Further details"]);
    }

    #[test]
    fn heading_with_colon_merges_into_next_paragraph() {
        let words = vec![
            word("Data", 0.0, 100.0),
            word("availability:", 30.0, 100.0),
            word("All", 0.0, 130.0),
            word("data", 20.0, 130.0),
        ];
        let paras = words_to_paragraphs(&words, &NormalizerConfig::default());
        assert_eq!(paras, vec!["Data availability: All data"]);
    }

    #[test]
    fn split_simple_uses_blank_lines() {
        let paras = split_simple("one\ntwo\n\nthree");
        assert_eq!(paras, vec!["one two", "three"]);
    }

    #[test]
    fn split_simple_drops_empty_blocks() {
        let paras = split_simple("\n\n   \n\nbody");
        assert_eq!(paras, vec!["body"]);
    }
}
