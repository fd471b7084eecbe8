//! The orchestrating agent: one `analyze` call composing normalization,
//! chunk/embedding retrieval, availability extraction, and DOI/title
//! resolution into a single structured result.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

pub mod agent;
pub mod chunk;
pub mod context;
pub mod doi;
pub mod title;

pub use agent::{Agent, AgentBuilder};
pub use chunk::{chunk_text, Chunk, VectorIndex, CHUNK_OVERLAP, CHUNK_SIZE};

use openavail_extract::Diagnostics;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Unreadable or empty input. Not retryable.
    #[error("invalid PDF: {0}")]
    InvalidPdf(String),
    /// The embedding endpoint has no such model. Needs provisioning, not
    /// a retry.
    #[error("embedding model is not available: {0}")]
    EmbeddingModelMissing(String),
    /// The extraction or embedding service failed after internal retries.
    #[error("language model service error: {0}")]
    LlmService(String),
    #[error("analysis timed out after {0} seconds")]
    Timeout(u64),
    #[error("internal analysis failure: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Short machine-readable kind for persistence.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidPdf(_) => "invalid_pdf",
            AnalysisError::EmbeddingModelMissing(_) => "embedding_model_missing",
            AnalysisError::LlmService(_) => "llm_service",
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::Internal(_) => "internal",
        }
    }
}

impl From<openavail_normalizer::NormalizerError> for AnalysisError {
    fn from(err: openavail_normalizer::NormalizerError) -> Self {
        AnalysisError::InvalidPdf(err.to_string())
    }
}

impl From<openavail_llm::LlmError> for AnalysisError {
    fn from(err: openavail_llm::LlmError) -> Self {
        match err {
            openavail_llm::LlmError::ModelMissing(model) => {
                AnalysisError::EmbeddingModelMissing(model)
            }
            other => AnalysisError::LlmService(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleSource {
    Heuristic,
    Llm,
    Enriched,
}

/// The structured outcome of analyzing one document.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub source_file: String,
    pub title: Option<String>,
    pub title_source: Option<TitleSource>,
    pub doi: Option<String>,
    pub data_statement: Option<String>,
    pub code_statement: Option<String>,
    pub data_links: Vec<String>,
    pub code_links: Vec<String>,
    pub data_sharing_license: Option<String>,
    pub code_license: Option<String>,
    pub confidence_scores: BTreeMap<String, f64>,
    pub diagnostics: Diagnostics,
}

impl AnalysisResult {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            title: None,
            title_source: None,
            doi: None,
            data_statement: None,
            code_statement: None,
            data_links: vec![],
            code_links: vec![],
            data_sharing_license: None,
            code_license: None,
            confidence_scores: BTreeMap::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(AnalysisError::InvalidPdf("x".into()).kind(), "invalid_pdf");
        assert_eq!(
            AnalysisError::EmbeddingModelMissing("m".into()).kind(),
            "embedding_model_missing"
        );
        assert_eq!(AnalysisError::Timeout(120).kind(), "timeout");
    }

    #[test]
    fn llm_errors_map_into_taxonomy() {
        let err: AnalysisError = openavail_llm::LlmError::ModelMissing("embed-v1".into()).into();
        assert!(matches!(err, AnalysisError::EmbeddingModelMissing(_)));
        let err: AnalysisError = openavail_llm::LlmError::Timeout.into();
        assert!(matches!(err, AnalysisError::LlmService(_)));
    }

    #[test]
    fn result_serializes_with_confidences() {
        let mut r = AnalysisResult::new("paper.pdf");
        r.confidence_scores.insert("doi".into(), 0.9);
        let v = r.to_json();
        assert_eq!(v["source_file"], "paper.pdf");
        assert_eq!(v["confidence_scores"]["doi"], 0.9);
    }
}
