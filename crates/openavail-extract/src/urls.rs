//! Link extraction, repair, and DOI normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:https?://|www\.)[^\s<>\u{201C}\u{201D}]+").unwrap());
static URL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9][\w\-.]*\.[a-zA-Z]{2,}(/[^\s]*)?$").unwrap()
});
pub(crate) static DOI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:doi:\s*)?(?:https?://(?:dx\.)?doi\.org/)?(10\.\d{4,9}/[^\s"<>]+)"#).unwrap()
});
// Trailing parenthetical citation glued onto a DOI, e.g.
// "10.5061/dryad.q205m(Lucas-Barbosaetal.2015)".
static DOI_CITATION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([A-Za-z][^)]*\d{4}\)?$").unwrap());
static MULTI_SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^:])//+").unwrap());
// A URL whose line ends mid-path: the tail hints continuation.
static FRAGMENT_JOIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://\S*[=\-_/])\s+([\w\-./?=&%#~+]+)").unwrap());

/// Rejoin URLs fragmented by line breaks when the break point looks like a
/// continuation (URL ends in `=`, `-`, `_`, or `/` and the next token is
/// path-like).
pub fn repair_fragmented_urls(text: &str) -> String {
    let mut out = text.to_string();
    // Repeat so multiply-fragmented URLs collapse fully.
    loop {
        let repaired = FRAGMENT_JOIN.replace_all(&out, "$1$2").into_owned();
        if repaired == out {
            return out;
        }
        out = repaired;
    }
}

/// Repair a single raw URL candidate: add a scheme to bare `www.` links,
/// collapse duplicate slashes in the path, and strip trailing punctuation
/// that prose attached to it.
pub fn repair_url(raw: &str) -> String {
    let mut url = raw.trim().to_string();
    if url.starts_with("www.") {
        url = format!("https://{url}");
    }
    url = MULTI_SLASH.replace_all(&url, "$1/").into_owned();
    while url.ends_with([']', ')', '.', ',', ';']) {
        // Keep a closing paren that the URL itself opened.
        if url.ends_with(')') && url.matches('(').count() >= url.matches(')').count() {
            break;
        }
        url.pop();
    }
    url
}

/// Syntactic URL validation: scheme, plausible host, sane length.
pub fn validate_url(url: &str) -> bool {
    url.len() >= 10 && url.len() <= 500 && URL_SHAPE.is_match(url)
}

/// Extract, repair, validate, and case-insensitively dedupe the URLs in a
/// text block.
pub fn extract_links(text: &str) -> Vec<String> {
    let repaired_text = repair_fragmented_urls(text);
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for m in URL_RE.find_iter(&repaired_text) {
        let url = repair_url(m.as_str());
        if !validate_url(&url) {
            continue;
        }
        let key = url.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(url);
        }
    }
    out
}

/// Host portion of a URL, lowercased, without port or credentials.
pub fn url_host(url: &str) -> Option<String> {
    let rest = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.rsplit('@').next()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

/// Normalize a DOI candidate: strip `doi:`/resolver prefixes, trailing
/// punctuation, and a glued-on citation suffix. Returns `None` when no
/// plausible DOI remains.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let caps = DOI_RE.captures(raw.trim())?;
    let mut doi = caps[1].to_string();
    loop {
        let before = doi.len();
        while doi.ends_with(['.', ',', ';', ')', ']']) {
            if doi.ends_with(')') && doi.matches('(').count() >= doi.matches(')').count() {
                break;
            }
            doi.pop();
        }
        doi = DOI_CITATION_SUFFIX.replace(&doi, "").into_owned();
        if doi.len() == before {
            break;
        }
    }
    if doi.len() > 7 && doi.contains('/') {
        Some(doi)
    } else {
        None
    }
}

/// DOI registrant prefix, e.g. `10.5281` for `10.5281/zenodo.123`.
pub fn doi_prefix(doi: &str) -> Option<&str> {
    doi.split('/').next()
}
