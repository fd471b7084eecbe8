//! Bibliographic registry resolution with a shared TTL cache.
//!
//! Network failures degrade to `None`; a registry outage never fails an
//! analysis, it only withholds verification.

use std::time::Duration;

use serde::Serialize;

pub mod cache;
pub mod crossref;
pub mod matching;
pub mod openalex;

pub use cache::RegistryCache;
pub use matching::title_similarity;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Metadata for a resolved DOI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryRecord {
    pub title: String,
    pub container_title: Option<String>,
    pub issued_year: Option<i32>,
}

/// Raw search hit from one registry, before similarity scoring.
#[derive(Debug, Clone)]
pub struct TitleCandidate {
    pub doi: String,
    pub title: String,
    pub issued_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrySource {
    Crossref,
    OpenAlex,
}

/// Best title-search match across registries.
#[derive(Debug, Clone, Serialize)]
pub struct TitleMatch {
    pub doi: String,
    pub title: String,
    pub issued_year: Option<i32>,
    pub score: f64,
    pub source: RegistrySource,
}

pub struct DoiRegistry {
    client: reqwest::Client,
    cache: RegistryCache,
    timeout: Duration,
    /// Tie-break winner when two registries score equally.
    preferred: RegistrySource,
}

impl Default for DoiRegistry {
    fn default() -> Self {
        Self::new(RegistryCache::default())
    }
}

impl DoiRegistry {
    pub fn new(cache: RegistryCache) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache,
            timeout: DEFAULT_TIMEOUT,
            preferred: RegistrySource::Crossref,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a DOI to registry metadata, consulting the cache first.
    /// Returns `None` for unknown DOIs and for network failures.
    pub async fn lookup(&self, doi: &str) -> Option<RegistryRecord> {
        if let Some(cached) = self.cache.get(doi) {
            return cached;
        }
        match crossref::lookup(&self.client, doi, self.timeout).await {
            Ok(record) => {
                self.cache.put(doi, record.clone());
                record
            }
            Err(err) => {
                tracing::warn!(doi, %err, "DOI lookup failed");
                None
            }
        }
    }

    /// Search both registries for a title and return the best-scoring
    /// candidate, tie-broken by the preferred source.
    pub async fn search_by_title(&self, title: &str) -> Option<TitleMatch> {
        let (crossref_hits, openalex_hits) = tokio::join!(
            crossref::search_by_title(&self.client, title, self.timeout),
            openalex::search_by_title(&self.client, title, self.timeout),
        );

        let mut candidates: Vec<TitleMatch> = Vec::new();
        match crossref_hits {
            Ok(hits) => candidates.extend(score_candidates(title, hits, RegistrySource::Crossref)),
            Err(err) => tracing::warn!(%err, "Crossref title search failed"),
        }
        match openalex_hits {
            Ok(hits) => candidates.extend(score_candidates(title, hits, RegistrySource::OpenAlex)),
            Err(err) => tracing::warn!(%err, "OpenAlex title search failed"),
        }

        select_best(candidates, self.preferred)
    }
}

fn score_candidates(
    query: &str,
    hits: Vec<TitleCandidate>,
    source: RegistrySource,
) -> Vec<TitleMatch> {
    hits.into_iter()
        .map(|c| TitleMatch {
            score: title_similarity(query, &c.title),
            doi: c.doi,
            title: c.title,
            issued_year: c.issued_year,
            source,
        })
        .collect()
}

fn select_best(candidates: Vec<TitleMatch>, preferred: RegistrySource) -> Option<TitleMatch> {
    candidates.into_iter().max_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                // On equal score, prefer the configured source.
                let a_pref = a.source == preferred;
                let b_pref = b.source == preferred;
                a_pref.cmp(&b_pref)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(doi: &str, title: &str, source: RegistrySource, score: f64) -> TitleMatch {
        TitleMatch {
            doi: doi.into(),
            title: title.into(),
            issued_year: Some(2020),
            score,
            source,
        }
    }

    #[test]
    fn best_score_wins_regardless_of_source() {
        let best = select_best(
            vec![
                candidate("10.1/a", "a", RegistrySource::Crossref, 0.4),
                candidate("10.2/b", "b", RegistrySource::OpenAlex, 0.9),
            ],
            RegistrySource::Crossref,
        )
        .unwrap();
        assert_eq!(best.doi, "10.2/b");
    }

    #[test]
    fn ties_break_toward_preferred_source() {
        let best = select_best(
            vec![
                candidate("10.1/open", "t", RegistrySource::OpenAlex, 0.8),
                candidate("10.2/cross", "t", RegistrySource::Crossref, 0.8),
            ],
            RegistrySource::Crossref,
        )
        .unwrap();
        assert_eq!(best.source, RegistrySource::Crossref);
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert!(select_best(vec![], RegistrySource::Crossref).is_none());
    }
}
