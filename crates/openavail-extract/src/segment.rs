//! Paragraph segmentation and heading labeling.

use once_cell::sync::Lazy;
use regex::Regex;

/// Which availability target a heading announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLabel {
    Data,
    Code,
    Generic,
}

/// A segmented paragraph, optionally carrying the heading label it opens
/// with.
#[derive(Debug, Clone)]
pub struct Paragraph {
    pub text: String,
    pub label: Option<HeadingLabel>,
    pub index: usize,
}

static DATA_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(data (and (code|materials?) )?availability( statement)?|availability of data( and materials?)?|data accessibility|open data)\b",
    )
    .unwrap()
});

static CODE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(code availability( statement)?|software availability|availability of code|code and software)\b")
        .unwrap()
});

static GENERIC_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(availability( statement)?|accessibility of materials)\b").unwrap());

/// Split page texts into labeled paragraphs. An inline "Heading: body"
/// split only happens when the colon is not part of a URL scheme.
pub fn segment_pages(pages: &[String]) -> Vec<Paragraph> {
    let mut out = Vec::new();
    for page in pages {
        for raw in page.split("\n\n") {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            let index = out.len();
            out.push(Paragraph {
                text: text.to_string(),
                label: classify_heading(text),
                index,
            });
        }
    }
    out
}

/// Detect the heading label a paragraph opens with, if any.
pub fn classify_heading(text: &str) -> Option<HeadingLabel> {
    let head = heading_prefix(text);
    if DATA_HEADING.is_match(head) {
        Some(HeadingLabel::Data)
    } else if CODE_HEADING.is_match(head) {
        Some(HeadingLabel::Code)
    } else if GENERIC_HEADING.is_match(head) {
        Some(HeadingLabel::Generic)
    } else {
        None
    }
}

/// A heading is the text up to the first colon that is not a URL scheme
/// separator, or the whole first line for an all-caps section header.
fn heading_prefix(text: &str) -> &str {
    if let Some(idx) = text.find(':') {
        let not_scheme = !text[..idx].ends_with("http") && !text[..idx].ends_with("https");
        if not_scheme {
            return &text[..idx];
        }
    }
    text.split('\n').next().unwrap_or(text)
}

/// True when the paragraph is only a heading with no body after it.
pub fn is_bare_heading(p: &Paragraph) -> bool {
    if p.label.is_none() {
        return false;
    }
    let body = match p.text.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => {
            // Headingless-colon form: whole paragraph is the heading phrase.
            let stripped = DATA_HEADING
                .replace(&p.text, "")
                .trim()
                .to_string();
            let stripped = CODE_HEADING.replace(&stripped, "").trim().to_string();
            return GENERIC_HEADING.replace(&stripped, "").trim().is_empty();
        }
    };
    body.is_empty()
}
