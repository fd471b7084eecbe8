//! Response parsing and validation against source contexts. Nothing the
//! model asserts is accepted unless it can be re-found in the supplied
//! passages.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::config::{
    EngineConfig, CODE_REPO_WHITELIST, DATASET_DOI_PREFIXES, DATA_REPO_WHITELIST, LINK_DENYLIST,
};
use crate::rank::RankedContext;
use crate::segment::HeadingLabel;
use crate::urls;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static AVAILABILITY_GATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(availab|accessible|access|request|provided|supplied|deposited|archived|shared)")
        .unwrap()
});

/// One side of the model's JSON answer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SideResponse {
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub raw_quote: String,
    #[serde(default)]
    pub clean_statement: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub data: SideResponse,
    #[serde(default)]
    pub code: SideResponse,
}

/// Parse the model reply as JSON, falling back to the outermost brace span
/// when the reply wraps the JSON in prose.
pub fn parse_response(reply: &str) -> Option<ExtractionResponse> {
    if let Ok(parsed) = serde_json::from_str::<ExtractionResponse>(reply) {
        return Some(parsed);
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<ExtractionResponse>(&reply[start..=end]).ok()
}

/// A statement that survived validation, tied back to its source context.
#[derive(Debug, Clone)]
pub struct ValidatedStatement {
    pub statement: String,
    pub raw_quote: String,
    pub links: Vec<String>,
    pub confidence: f64,
    pub source_index: usize,
    pub source_context: String,
}

fn normalize_for_match(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_lowercase()
}

/// True when the text carries at least one availability keyword, with the
/// label's own term counting for its side.
pub fn passes_keyword_gate(text: &str, label: HeadingLabel) -> bool {
    if AVAILABILITY_GATE.is_match(text) {
        return true;
    }
    let lower = text.to_lowercase();
    match label {
        HeadingLabel::Data => lower.contains("data"),
        HeadingLabel::Code => lower.contains("code") || lower.contains("software"),
        HeadingLabel::Generic => false,
    }
}

/// Accept a link only if it is syntactically valid, not deny-listed, and
/// either allow-listed for the label or a dataset-prefix DOI link.
pub fn link_allowed(url: &str, label: HeadingLabel) -> bool {
    let lower = url.to_lowercase();
    if LINK_DENYLIST.iter().any(|d| lower.contains(d)) {
        return false;
    }
    let Some(host) = urls::url_host(url) else {
        return false;
    };

    if host == "doi.org" || host == "dx.doi.org" {
        return match urls::normalize_doi(url) {
            Some(doi) => urls::doi_prefix(&doi)
                .map(|p| DATASET_DOI_PREFIXES.contains(&p))
                .unwrap_or(false),
            None => false,
        };
    }

    let whitelist = match label {
        HeadingLabel::Code => CODE_REPO_WHITELIST,
        _ => DATA_REPO_WHITELIST,
    };
    whitelist
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")))
}

/// Validate one side of the model answer against its candidate contexts.
/// Returns `None` when the answer cannot be trusted; the caller then falls
/// back to heuristics.
pub fn validate_side(
    side: &SideResponse,
    contexts: &[RankedContext],
    label: HeadingLabel,
    _config: &EngineConfig,
) -> Option<ValidatedStatement> {
    if side.verdict != "present" {
        return None;
    }
    let quote = side.raw_quote.trim();
    if quote.len() < 15 || quote.split_whitespace().count() < 3 {
        return None;
    }

    // The quote must re-occur verbatim (modulo whitespace and case) inside
    // one of the passages the model was shown.
    let needle = normalize_for_match(quote);
    let matched = contexts
        .iter()
        .find(|ctx| normalize_for_match(&ctx.text).contains(&needle))?;

    if !passes_keyword_gate(quote, label) {
        return None;
    }

    let context_norm = normalize_for_match(&matched.text);
    let mut links: Vec<String> = Vec::new();
    for raw in &side.links {
        let url = urls::repair_url(raw);
        if !urls::validate_url(&url) || !link_allowed(&url, label) {
            continue;
        }
        // Hallucination guard: the link must occur in the source context.
        if !context_norm.contains(&url.to_lowercase()) {
            continue;
        }
        if !links.iter().any(|l| l.eq_ignore_ascii_case(&url)) {
            links.push(url);
        }
    }

    let statement = if side.clean_statement.trim().len() >= quote.len() / 2
        && !side.clean_statement.trim().is_empty()
    {
        side.clean_statement.trim().to_string()
    } else {
        quote.to_string()
    };

    Some(ValidatedStatement {
        statement,
        raw_quote: quote.to_string(),
        links,
        confidence: side.confidence.clamp(0.0, 1.0),
        source_index: matched.index,
        source_context: matched.text.clone(),
    })
}
