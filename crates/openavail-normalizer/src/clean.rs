//! Paragraph-level text cleanup: hyphenation repair, OCR artifact
//! compaction, URL canonicalization, and boilerplate filtering.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s]+").unwrap());
static HYPHEN_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])[\u{2010}\u{2011}-]\s+([a-z])").unwrap());
// Runs of five or more lone letters are OCR spacing damage.
static SPACED_LETTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\b[a-zA-Z]\b\s+){4,}[a-zA-Z]\b").unwrap());
static FUSED_URLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://[^\s]{10,}?)(https?://)").unwrap());
static SPLIT_PROTOCOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?)\s*:\s*/\s*/\s*").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const BOILERPLATE_MARKERS: &[&str] = &[
    "orcid",
    "keywords:",
    "received:",
    "accepted:",
    "submitted:",
    "correspondence",
    "\u{a9}",
    "copyright",
    "references",
];

const INVISIBLE_CHARS: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{00AD}', '\u{FEFF}'];

// Words that legitimately follow a URL in prose; a space before one of
// these ends the URL instead of being squeezed out of it.
const URL_STOP_WORDS: &[&str] = &[
    " and ", " the ", " on ", " at ", " in ", " from ", " or ", " to ", " are ", " is ",
];

/// Clean a single assembled paragraph. Returns `None` when the paragraph is
/// front-matter or reference boilerplate that should be dropped outright.
pub fn clean_paragraph(paragraph: &str) -> Option<String> {
    let mut text = paragraph.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    let is_section_heading = matches!(
        lower.as_str(),
        "references" | "bibliography" | "literature cited"
    );
    // Bare section headings stay; downstream consumers use them as
    // document-structure boundaries.
    if !is_section_heading
        && text.len() < 160
        && BOILERPLATE_MARKERS.iter().any(|m| lower.contains(m))
    {
        return None;
    }

    // Normalize unicode dashes so de-hyphenation sees them.
    text = text.replace(['\u{2013}', '\u{2014}'], "-");

    // Rejoin protocols the line break split apart, so the URLs they open
    // are detected below.
    text = SPLIT_PROTOCOL.replace_all(&text, "$1://").into_owned();

    // Protect URLs behind placeholders before word-level repairs touch them.
    let mut urls: Vec<String> = Vec::new();
    text = URL_RE
        .replace_all(&text, |caps: &regex::Captures| {
            urls.push(caps[0].to_string());
            format!("\u{1}URL{}\u{1}", urls.len() - 1)
        })
        .into_owned();

    text = HYPHEN_BREAK.replace_all(&text, "$1$2").into_owned();
    text = SPACED_LETTERS
        .replace_all(&text, |caps: &regex::Captures| {
            caps[0].split_whitespace().collect::<String>()
        })
        .into_owned();
    text = WHITESPACE.replace_all(&text, " ").trim().to_string();

    for (i, url) in urls.iter().enumerate() {
        let canonical = canonicalize_url(url);
        text = text.replace(&format!("\u{1}URL{i}\u{1}"), &canonical);
    }

    // Two URLs fused without whitespace between them.
    text = FUSED_URLS.replace_all(&text, "$1 $2").into_owned();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Repair a URL mangled by PDF extraction: strip invisible unicode, unwrap
/// mail-gateway redirects, rejoin a split protocol, and squeeze out spaces
/// the line break introduced.
pub fn canonicalize_url(url: &str) -> String {
    let mut url: String = url.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect();

    if let Some(rest) = url.split("urldefense.com/v3/__").nth(1) {
        let inner = rest.split("__;").next().unwrap_or(rest);
        url = inner.replace("*", "");
    }

    url = SPLIT_PROTOCOL.replace(&url, "$1://").into_owned();

    // Squeeze internal spaces, but stop at prose words that signal the URL
    // already ended.
    if url.contains(' ') {
        for stop in URL_STOP_WORDS {
            if let Some(idx) = url.find(stop) {
                url.truncate(idx);
            }
        }
        url = url.chars().filter(|c| *c != ' ').collect();
    }

    if url.len() > 200 {
        let mut cut = 200;
        while !url.is_char_boundary(cut) {
            cut -= 1;
        }
        url.truncate(cut);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_line_break_is_repaired() {
        let out = clean_paragraph("the avail- able data").unwrap();
        assert_eq!(out, "the available data");
    }

    #[test]
    fn ocr_letter_spacing_is_compacted() {
        let out = clean_paragraph("see the a v a i l a b l e dataset").unwrap();
        assert!(out.contains("available"), "got: {out}");
    }

    #[test]
    fn boilerplate_paragraph_is_dropped() {
        assert!(clean_paragraph("Received: 3 May 2021 Accepted: 9 June 2021").is_none());
        assert!(clean_paragraph("ORCID: 0000-0002-1234-5678").is_none());
    }

    #[test]
    fn bare_references_heading_is_kept() {
        assert_eq!(clean_paragraph("References").as_deref(), Some("References"));
        assert_eq!(
            clean_paragraph("LITERATURE CITED").as_deref(),
            Some("LITERATURE CITED")
        );
    }

    #[test]
    fn long_paragraph_mentioning_copyright_survives() {
        let body = "This statement discusses copyright licensing of the deposited dataset \
                    at length and should not be mistaken for a front matter notice because \
                    it carries substantial prose alongside availability wording.";
        assert!(clean_paragraph(body).is_some());
    }

    #[test]
    fn url_with_split_protocol_is_rejoined() {
        let out = clean_paragraph("data at https : / / osf.io/abcde").unwrap();
        assert!(out.contains("https://osf.io/abcde"), "got: {out}");
    }

    #[test]
    fn url_internal_spaces_are_squeezed() {
        let out = canonicalize_url("https://zenodo.org/rec ord/9876");
        assert_eq!(out, "https://zenodo.org/record/9876");
    }

    #[test]
    fn url_stop_word_ends_the_url() {
        let out = canonicalize_url("https://osf.io/abcde and the supplement");
        assert_eq!(out, "https://osf.io/abcde");
    }

    #[test]
    fn invisible_unicode_is_stripped_from_urls() {
        let out = canonicalize_url("https://doi.org/10.5281/zen\u{200B}odo.123");
        assert_eq!(out, "https://doi.org/10.5281/zenodo.123");
    }

    #[test]
    fn urldefense_wrapper_is_unwrapped() {
        let out =
            canonicalize_url("https://urldefense.com/v3/__https://osf.io/xyz__;!!abc$");
        assert_eq!(out, "https://osf.io/xyz");
    }

    #[test]
    fn fused_urls_are_separated() {
        let out = clean_paragraph("links https://zenodo.org/record/1https://osf.io/a").unwrap();
        assert!(out.contains("record/1 https://osf.io/a"), "got: {out}");
    }

    #[test]
    fn overlong_url_is_capped() {
        let long = format!("https://example.org/{}", "a".repeat(400));
        assert_eq!(canonicalize_url(&long).len(), 200);
    }

    #[test]
    fn overlong_url_cap_lands_on_a_char_boundary() {
        let long = format!("https://example.org/x{}", "\u{e4}".repeat(150));
        let out = canonicalize_url(&long);
        assert!(out.len() <= 200);
        assert!(out.starts_with("https://example.org/x\u{e4}"));
    }
}
