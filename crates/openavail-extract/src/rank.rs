//! Keyword scoring and per-label ranking of candidate paragraphs.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::EngineConfig;
use crate::segment::{is_bare_heading, HeadingLabel, Paragraph};

/// Where a ranked context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSource {
    Heading,
    Phrase,
    Global,
}

/// A candidate paragraph for one label, carrying its heuristic score.
#[derive(Debug, Clone)]
pub struct RankedContext {
    pub label: HeadingLabel,
    pub text: String,
    pub score: f64,
    pub source: ContextSource,
    pub index: usize,
}

const DATA_KEYWORDS: &[&str] = &[
    "data availability",
    "data are available",
    "data is available",
    "dataset",
    "deposited",
    "archived",
    "repository",
    "accession",
    "zenodo",
    "dryad",
    "figshare",
    "pangaea",
    "dataverse",
    "supplementary data",
];

const CODE_KEYWORDS: &[&str] = &[
    "code availability",
    "code is available",
    "code are available",
    "source code",
    "scripts",
    "github",
    "gitlab",
    "software",
    "analysis code",
    "r code",
];

const DENY_PHRASES: &[&str] = &[
    "conflict of interest",
    "competing interests",
    "author contributions",
    "acknowledg",
    "funding",
    "ethics",
];

static ON_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(upon|on)\s+(reasonable\s+)?request\b").unwrap());
static SUPPLEMENTARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsupplementary (material|information|files?)\b").unwrap());

fn label_term(label: HeadingLabel) -> &'static str {
    match label {
        HeadingLabel::Data => "data",
        HeadingLabel::Code => "code",
        HeadingLabel::Generic => "availab",
    }
}

/// Score one paragraph for one target label.
pub fn score_paragraph(
    p: &Paragraph,
    prev: Option<&Paragraph>,
    label: HeadingLabel,
    config: &EngineConfig,
) -> (f64, ContextSource) {
    let lower = p.text.to_lowercase();
    let mut score = 0.0;
    let mut source = ContextSource::Global;

    match p.label {
        Some(l) if l == label => {
            score += config.heading_weight;
            source = ContextSource::Heading;
        }
        Some(HeadingLabel::Generic) => {
            score += config.generic_weight;
            source = ContextSource::Heading;
        }
        _ => {}
    }

    // A paragraph directly after a matching heading inherits relevance
    // even when the heading paragraph itself carried no body.
    if let Some(prev) = prev {
        if prev.label == Some(label) || prev.label == Some(HeadingLabel::Generic) {
            score += config.after_heading_bonus;
            if source == ContextSource::Global {
                source = ContextSource::Heading;
            }
        }
    }

    let keywords = match label {
        HeadingLabel::Code => CODE_KEYWORDS,
        _ => DATA_KEYWORDS,
    };
    let mut keyword_hits = 0usize;
    for kw in keywords {
        if lower.contains(kw) {
            keyword_hits += 1;
        }
    }
    score += keyword_hits as f64 * config.keyword_weight;

    if lower.contains("available") && lower.contains(label_term(label)) {
        score += config.available_with_label_bonus;
        if source == ContextSource::Global {
            source = ContextSource::Phrase;
        }
    }
    if ON_REQUEST.is_match(&lower) {
        score += config.on_request_bonus;
    }
    if SUPPLEMENTARY.is_match(&lower) {
        score += config.supplementary_bonus;
    }
    for deny in DENY_PHRASES {
        if lower.contains(deny) {
            score -= config.deny_penalty;
        }
    }
    if is_bare_heading(p) {
        score -= config.bare_heading_penalty;
    }
    if keyword_hits > 0 && source == ContextSource::Global {
        source = ContextSource::Phrase;
    }

    (score, source)
}

/// Rank all paragraphs for a label: score, drop at-or-below threshold, sort
/// descending, keep the top `max_contexts`.
pub fn rank_contexts(
    paragraphs: &[Paragraph],
    label: HeadingLabel,
    config: &EngineConfig,
) -> Vec<RankedContext> {
    let mut ranked: Vec<RankedContext> = Vec::new();
    for (i, p) in paragraphs.iter().enumerate() {
        let prev = if i > 0 { Some(&paragraphs[i - 1]) } else { None };
        let (score, source) = score_paragraph(p, prev, label, config);
        if score > config.min_score {
            ranked.push(RankedContext {
                label,
                text: p.text.clone(),
                score,
                source,
                index: p.index,
            });
        }
    }
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
    ranked.truncate(config.max_contexts);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment_pages;

    fn rank(text: &str, label: HeadingLabel) -> Vec<RankedContext> {
        let paras = segment_pages(&[text.to_string()]);
        rank_contexts(&paras, label, &EngineConfig::default())
    }

    #[test]
    fn heading_paragraph_ranks_first() {
        let text = "Introduction\n\nWe studied beetles.\n\nData availability: All data are deposited at Zenodo.";
        let ranked = rank(text, HeadingLabel::Data);
        assert!(!ranked.is_empty());
        assert!(ranked[0].text.starts_with("Data availability"));
        assert_eq!(ranked[0].source, ContextSource::Heading);
        assert!(ranked[0].score > 5.0);
    }

    #[test]
    fn paragraph_after_bare_heading_gets_bonus() {
        let text = "DATA AVAILABILITY\n\nAll data are available at https://zenodo.org/record/12345.";
        let paras = segment_pages(&[text.to_string()]);
        let config = EngineConfig::default();
        let (score, _) = score_paragraph(&paras[1], Some(&paras[0]), HeadingLabel::Data, &config);
        let (bare_score, _) = score_paragraph(&paras[0], None, HeadingLabel::Data, &config);
        assert!(score > bare_score, "body {score} vs bare heading {bare_score}");
    }

    #[test]
    fn low_scoring_prose_is_discarded() {
        let ranked = rank("We sampled 40 plots in the spring of 2019.", HeadingLabel::Data);
        assert!(ranked.is_empty());
    }

    #[test]
    fn deny_phrases_suppress_unrelated_sections() {
        let text = "Conflict of interest: the authors declare no competing interests regarding data.";
        let ranked = rank(text, HeadingLabel::Data);
        assert!(ranked.is_empty(), "{ranked:?}");
    }

    #[test]
    fn code_label_prefers_code_keywords() {
        let text = "Analysis scripts are available on GitHub at https://github.com/lab/repo.\n\nAll data are archived in a repository.";
        let ranked = rank(text, HeadingLabel::Code);
        assert!(ranked[0].text.contains("GitHub"));
    }

    #[test]
    fn ranking_respects_max_contexts() {
        let mut pages = String::new();
        for i in 0..12 {
            pages.push_str(&format!(
                "Data are available in a repository, dataset {i} deposited and archived.\n\n"
            ));
        }
        let ranked = rank(&pages, HeadingLabel::Data);
        assert_eq!(ranked.len(), EngineConfig::default().max_contexts);
    }
}
