//! Context repair: expand an accepted short quote to its enclosing
//! paragraph and complete sentences, without ever inventing text.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const MAX_CONTEXT_CHARS: usize = 600;

/// Expand `statement` to its surrounding paragraph in `full_text`, trimmed
/// to whole sentences and capped in length. Returns the original statement
/// when it cannot be located.
pub fn expand_statement_context(statement: &str, full_text: &str) -> String {
    let needle = normalize(statement);
    if needle.is_empty() {
        return statement.to_string();
    }

    let paragraph = full_text
        .split("\n\n")
        .find(|p| normalize(p).contains(&needle));
    let Some(paragraph) = paragraph else {
        return statement.to_string();
    };

    let expanded = WHITESPACE.replace_all(paragraph.trim(), " ").into_owned();
    if expanded.len() <= statement.trim().len() {
        return statement.to_string();
    }
    if expanded.chars().count() <= MAX_CONTEXT_CHARS {
        return expanded;
    }

    // Too long: keep the sentences around the quote, up to the cap.
    let norm_expanded = normalize(&expanded);
    let offset = norm_expanded.find(&needle).unwrap_or(0);
    clamp_to_sentences(&expanded, offset, needle.len())
}

fn normalize(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_lowercase()
}

/// Cut a window of complete sentences covering `[offset, offset+len)`.
fn clamp_to_sentences(text: &str, offset: usize, len: usize) -> String {
    let bytes = text.as_bytes();
    let target_end = (offset + len).min(bytes.len());

    let mut start = offset.min(bytes.len());
    while start > 0 {
        if start >= 2 && matches!(bytes[start - 2], b'.' | b'!' | b'?') && bytes[start - 1] == b' '
        {
            break;
        }
        start -= 1;
    }
    let mut end = target_end;
    while end < bytes.len() {
        if matches!(bytes[end], b'.' | b'!' | b'?')
            && bytes.get(end + 1).map(|b| *b == b' ').unwrap_or(true)
        {
            end += 1;
            break;
        }
        end += 1;
    }

    // Align to char boundaries before slicing.
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }

    let mut out = text[start..end].trim().to_string();
    if out.chars().count() > MAX_CONTEXT_CHARS {
        out = out.chars().take(MAX_CONTEXT_CHARS).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_quote_expands_to_its_paragraph() {
        let full = "Methods were standard.\n\nData availability: All data are archived at \
                    Zenodo under accession 12345 and mirrored on request.\n\nWe thank reviewers.";
        let out = expand_statement_context("All data are archived at Zenodo", full);
        assert!(out.starts_with("Data availability:"));
        assert!(out.ends_with("on request."));
    }

    #[test]
    fn unlocatable_statement_is_returned_unchanged() {
        let out = expand_statement_context("this text is nowhere", "completely different corpus");
        assert_eq!(out, "this text is nowhere");
    }

    #[test]
    fn expansion_is_capped() {
        let filler = "All measurements were repeated. ".repeat(40);
        let full = format!("{filler}The data are deposited at https://osf.io/abcde. {filler}");
        let out = expand_statement_context("The data are deposited at https://osf.io/abcde.", &full);
        assert!(out.chars().count() <= 600);
        assert!(out.contains("https://osf.io/abcde"));
    }

    #[test]
    fn whitespace_differences_do_not_block_matching() {
        let full = "Data availability:  All   data\nare archived at Dryad.";
        let out = expand_statement_context("All data are archived at Dryad.", full);
        assert!(out.contains("archived at Dryad"));
    }
}
