//! Word and character geometry types plus recovery of word tokens from
//! character boxes when the upstream extractor produced degenerate output.

/// A positioned word token from a PDF page.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

/// A single positioned glyph, used to rebuild words when the extractor
/// reports one "word" per character.
#[derive(Debug, Clone, PartialEq)]
pub struct CharBox {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

/// One page of extracted geometry.
#[derive(Debug, Clone, Default)]
pub struct PageGeometry {
    pub width: f64,
    pub words: Vec<Word>,
    pub chars: Vec<CharBox>,
}

impl PageGeometry {
    pub fn from_words(width: f64, words: Vec<Word>) -> Self {
        Self {
            width,
            words,
            chars: vec![],
        }
    }
}

/// Fraction of non-empty word tokens that are a single alphabetic letter.
pub fn singleton_ratio(words: &[Word]) -> f64 {
    let mut singles = 0usize;
    let mut total = 0usize;
    for w in words {
        if w.text.is_empty() {
            continue;
        }
        total += 1;
        let mut chars = w.text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_alphabetic() {
                singles += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        singles as f64 / total as f64
    }
}

/// Rebuild word tokens from character boxes: group chars into lines by
/// y-position, then split each line into tokens wherever the horizontal gap
/// exceeds 60% of the median glyph width.
pub fn rebuild_words_from_chars(chars: &[CharBox], line_tolerance: f64) -> Vec<Word> {
    if chars.is_empty() {
        return vec![];
    }

    let mut sorted: Vec<&CharBox> = chars.iter().collect();
    sorted.sort_by(|a, b| {
        (a.top, a.x0)
            .partial_cmp(&(b.top, b.x0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let tol = line_tolerance.max(1.5);
    let mut lines: Vec<Vec<&CharBox>> = Vec::new();
    let mut current: Vec<&CharBox> = Vec::new();
    let mut last_top: Option<f64> = None;
    for ch in sorted {
        match last_top {
            Some(t) if (ch.top - t).abs() > tol => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current.push(ch);
            }
            _ => current.push(ch),
        }
        last_top = Some(ch.top);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let mut rebuilt: Vec<Word> = Vec::new();
    for mut line in lines {
        line.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(std::cmp::Ordering::Equal));

        let mut widths: Vec<f64> = line.iter().map(|c| c.x1 - c.x0).collect();
        widths.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_w = if widths.is_empty() {
            1.0
        } else {
            widths[widths.len() / 2]
        };
        let gap_threshold = (0.6 * median_w).max(1.0);

        let mut token: Vec<&CharBox> = Vec::new();
        let mut prev_x1: Option<f64> = None;
        for ch in line {
            if let Some(x1) = prev_x1 {
                if ch.x0 - x1 > gap_threshold {
                    push_token(&mut rebuilt, &token);
                    token.clear();
                }
            }
            token.push(ch);
            prev_x1 = Some(ch.x1);
        }
        push_token(&mut rebuilt, &token);
    }
    rebuilt
}

fn push_token(out: &mut Vec<Word>, token: &[&CharBox]) {
    if token.is_empty() {
        return;
    }
    let text: String = token.iter().map(|c| c.text.as_str()).collect();
    let text = text.trim().to_string();
    if text.is_empty() {
        return;
    }
    out.push(Word {
        text,
        x0: token[0].x0,
        x1: token[token.len() - 1].x1,
        top: token
            .iter()
            .map(|c| c.top)
            .fold(f64::INFINITY, f64::min),
        bottom: token
            .iter()
            .map(|c| c.bottom)
            .fold(f64::NEG_INFINITY, f64::max),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cb(text: &str, x0: f64, x1: f64, top: f64) -> CharBox {
        CharBox {
            text: text.into(),
            x0,
            x1,
            top,
            bottom: top + 10.0,
        }
    }

    #[test]
    fn singleton_ratio_counts_single_letters() {
        let words = vec![
            Word {
                text: "t".into(),
                x0: 0.0,
                x1: 5.0,
                top: 0.0,
                bottom: 10.0,
            },
            Word {
                text: "word".into(),
                x0: 10.0,
                x1: 30.0,
                top: 0.0,
                bottom: 10.0,
            },
        ];
        assert!((singleton_ratio(&words) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rebuild_groups_adjacent_chars_into_words() {
        // "at sea": tight glyphs, then a wide gap, then tight glyphs
        let chars = vec![
            cb("a", 0.0, 5.0, 100.0),
            cb("t", 5.5, 10.0, 100.0),
            cb("s", 25.0, 30.0, 100.0),
            cb("e", 30.5, 35.0, 100.0),
            cb("a", 35.5, 40.0, 100.0),
        ];
        let words = rebuild_words_from_chars(&chars, 2.5);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["at", "sea"]);
    }

    #[test]
    fn rebuild_separates_lines_by_top() {
        let chars = vec![
            cb("a", 0.0, 5.0, 100.0),
            cb("b", 5.5, 10.0, 100.0),
            cb("c", 0.0, 5.0, 120.0),
        ];
        let words = rebuild_words_from_chars(&chars, 2.5);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "ab");
        assert_eq!(words[1].text, "c");
    }
}
