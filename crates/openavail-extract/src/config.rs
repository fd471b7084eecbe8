//! Tunable parameters for the availability extraction engine. The scoring
//! weights are empirically tuned starting points, exposed so callers can
//! adjust them without code changes.

/// Hosts trusted as primary data/code archives.
pub const DATA_REPO_WHITELIST: &[&str] = &[
    "zenodo.org",
    "figshare.com",
    "datadryad.org",
    "dryad.org",
    "osf.io",
    "pangaea.de",
    "data.mendeley.com",
    "openneuro.org",
    "dataverse.org",
    "purl.org",
    "ebi.ac.uk",
    "ncbi.nlm.nih.gov",
    "ega-archive.org",
];

/// Hosts trusted for code availability.
pub const CODE_REPO_WHITELIST: &[&str] = &[
    "github.com",
    "gitlab.com",
    "bitbucket.org",
    "codeberg.org",
    "zenodo.org",
    "osf.io",
];

/// DOI registrant prefixes used by well-known data archives.
pub const DATASET_DOI_PREFIXES: &[&str] = &[
    "10.5281", "10.6084", "10.5061", "10.17605", "10.1594", "10.7910", "10.18112",
];

/// Link substrings that are never availability targets.
pub const LINK_DENYLIST: &[&str] = &["orcid.org", "urldefense.com", "crossmark", "creativecommons.org"];

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Score for a paragraph under an exact "data availability" style heading.
    pub heading_weight: f64,
    /// Score for a generic availability heading not tied to one label.
    pub generic_weight: f64,
    /// Bonus for the paragraph immediately following a matching heading.
    pub after_heading_bonus: f64,
    /// Per-keyword hit weight.
    pub keyword_weight: f64,
    /// Bonus when "available" co-occurs with the label term.
    pub available_with_label_bonus: f64,
    /// Bonus for "upon (reasonable) request" phrasing.
    pub on_request_bonus: f64,
    /// Bonus for supplementary-material phrasing.
    pub supplementary_bonus: f64,
    /// Penalty per deny-listed phrase.
    pub deny_penalty: f64,
    /// Penalty for a heading with no body text after it.
    pub bare_heading_penalty: f64,
    /// Contexts scoring at or below this are discarded.
    pub min_score: f64,
    /// Upper bound on ranked contexts per label.
    pub max_contexts: usize,
    /// Confidence ceiling for heuristic fallback results.
    pub fallback_confidence_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heading_weight: 5.0,
            generic_weight: 1.0,
            after_heading_bonus: 2.2,
            keyword_weight: 1.4,
            available_with_label_bonus: 1.2,
            on_request_bonus: 0.5,
            supplementary_bonus: 0.4,
            deny_penalty: 1.5,
            bare_heading_penalty: 3.0,
            min_score: 0.5,
            max_contexts: 8,
            fallback_confidence_cap: 0.6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = EngineConfig::default();
        assert!(c.heading_weight > c.generic_weight);
        assert!(c.min_score > 0.0);
        assert_eq!(c.max_contexts, 8);
        assert!(c.fallback_confidence_cap <= 0.6);
    }
}
