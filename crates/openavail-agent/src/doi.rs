//! DOI provenance: deterministic harvesting from front matter, a guarded
//! model fallback, and registry verification.

use once_cell::sync::Lazy;
use regex::Regex;

use openavail_extract::urls::normalize_doi;
use openavail_registry::{title_similarity, DoiRegistry};

/// Harvesting stops at the references section; everything after it is
/// other papers' DOIs.
static REFERENCES_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(references|bibliography|literature cited)\s*$").unwrap());
static DOI_CANDIDATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:doi:\s*)?(?:https?://(?:dx\.)?doi\.org/)?(10\.\d{4,9}/[^\s"<>]+)"#).unwrap()
});

const PRE_REFERENCES_WINDOW: usize = 20_000;

/// Confidence assigned per harvesting route.
pub const CONFIDENCE_FRONT_MATTER: f64 = 0.9;
pub const CONFIDENCE_LLM: f64 = 0.7;
pub const CONFIDENCE_SWEEP: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub enum DoiOrigin {
    FrontMatter,
    Llm,
    Sweep,
    Enriched,
}

#[derive(Debug, Clone)]
pub struct DoiFinding {
    pub doi: String,
    pub confidence: f64,
    pub origin: DoiOrigin,
    pub verified_title: Option<String>,
}

/// First DOI in the text before the references section, bounded to the
/// leading window.
pub fn harvest_front_matter(full_text: &str) -> Option<String> {
    let cutoff = REFERENCES_HEADING
        .find(full_text)
        .map(|m| m.start())
        .unwrap_or(full_text.len())
        .min(PRE_REFERENCES_WINDOW);
    let window = safe_prefix(full_text, cutoff);
    first_doi(window)
}

/// Last resort: the first DOI anywhere in the document.
pub fn sweep(full_text: &str) -> Option<String> {
    first_doi(full_text)
}

fn first_doi(text: &str) -> Option<String> {
    for caps in DOI_CANDIDATE.captures_iter(text) {
        if let Some(doi) = normalize_doi(&caps[0]) {
            return Some(doi);
        }
    }
    None
}

fn safe_prefix(text: &str, mut end: usize) -> &str {
    end = end.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Hallucination guard: a model-proposed DOI counts only if it occurs
/// somewhere in the document text.
pub fn occurs_in_document(doi: &str, full_text: &str) -> bool {
    let lower = full_text.to_lowercase();
    let needle = doi.to_lowercase();
    // Tolerate spacing the PDF introduced inside the DOI.
    lower.contains(&needle) || lower.replace([' ', '\n'], "").contains(&needle)
}

/// Parse a model reply into a DOI, treating refusals as no answer.
pub fn doi_from_reply(reply: &str) -> Option<String> {
    let line = reply.lines().find(|l| !l.trim().is_empty())?.trim();
    if line.eq_ignore_ascii_case("none") {
        return None;
    }
    normalize_doi(line)
}

/// Verify a DOI against the registry: a strong title match boosts
/// confidence, a near-zero match penalizes it. Registry silence leaves the
/// finding untouched.
pub async fn verify_against_registry(
    finding: &mut DoiFinding,
    document_title: Option<&str>,
    registry: &DoiRegistry,
) {
    let Some(record) = registry.lookup(&finding.doi).await else {
        return;
    };
    finding.verified_title = Some(record.title.clone());
    let Some(title) = document_title else {
        return;
    };
    let score = title_similarity(title, &record.title);
    if score >= 0.5 {
        finding.confidence = (finding.confidence + 0.1).min(1.0);
    } else if score < 0.2 {
        tracing::debug!(doi = %finding.doi, score, "registry title disagrees with document");
        finding.confidence = (finding.confidence - 0.3).max(0.0);
    }
}

/// When the document itself yields no DOI, adopt a registry title-search
/// hit with a strong similarity score.
pub async fn enrich_from_title(title: &str, registry: &DoiRegistry) -> Option<DoiFinding> {
    let hit = registry.search_by_title(title).await?;
    if hit.score < 0.6 {
        return None;
    }
    Some(DoiFinding {
        doi: hit.doi,
        confidence: hit.score.min(0.8),
        origin: DoiOrigin::Enriched,
        verified_title: Some(hit.title),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_doi_is_found() {
        let text = "A paper title\nhttps://doi.org/10.1234/eco.2021.55\n\nIntroduction...";
        assert_eq!(
            harvest_front_matter(text),
            Some("10.1234/eco.2021.55".into())
        );
    }

    #[test]
    fn references_section_dois_are_ignored() {
        let text = "A paper with no front DOI.\n\nReferences\nSmith J (2019) doi:10.9999/other.paper";
        assert_eq!(harvest_front_matter(text), None);
        // The sweep still sees it.
        assert_eq!(sweep(text), Some("10.9999/other.paper".into()));
    }

    #[test]
    fn citation_suffix_is_stripped_during_harvest() {
        let text = "Data in 10.5061/dryad.q205m(Lucas-Barbosaetal.2015).";
        assert_eq!(sweep(text), Some("10.5061/dryad.q205m".into()));
    }

    #[test]
    fn hallucination_guard_checks_presence() {
        let text = "The dataset DOI is 10.5281/zenodo.4444.";
        assert!(occurs_in_document("10.5281/zenodo.4444", text));
        assert!(!occurs_in_document("10.5281/zenodo.9999", text));
    }

    #[test]
    fn guard_tolerates_internal_breaks() {
        let text = "doi: 10.5281/zen\nodo.4444";
        assert!(occurs_in_document("10.5281/zenodo.4444", text));
    }

    #[test]
    fn model_refusal_yields_no_doi() {
        assert_eq!(doi_from_reply("NONE"), None);
        assert_eq!(doi_from_reply("I could not find a DOI."), None);
        assert_eq!(
            doi_from_reply("10.1234/eco.2021.55\n"),
            Some("10.1234/eco.2021.55".into())
        );
    }
}
