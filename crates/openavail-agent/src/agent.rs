//! `analyze(pdf) -> AnalysisResult`: the composition of every pipeline
//! stage for one document.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use openavail_extract::engine::ChatFn;
use openavail_extract::validate::link_allowed;
use openavail_extract::{urls, AvailabilityEngine, HeadingLabel, StatementResult};
use openavail_llm::{ChatClient, ChatMessage, EmbeddingsClient};
use openavail_normalizer::{
    blocks_to_pages, blocks_to_text, GeometryBackend, LopdfBackend, NormalizerConfig, PageInput,
    ParagraphBlock, TextNormalizer,
};
use openavail_registry::DoiRegistry;

use crate::chunk::{chunk_text, VectorIndex, CHUNK_OVERLAP, CHUNK_SIZE};
use crate::context::expand_statement_context;
use crate::doi::{self, DoiFinding, DoiOrigin};
use crate::title;
use crate::{AnalysisError, AnalysisResult, TitleSource};

const TITLE_PROMPT: &str = "Return the exact title of this scientific paper, and nothing else. \
If you cannot determine it, answer NONE.";
const DOI_PROMPT: &str = "Return the DOI of this paper itself (not of cited works), and nothing \
else. If no DOI is present in the text, answer NONE.";
const DATA_LICENSE_PROMPT: &str = "Name the license under which the data described in this \
statement are released (for example CC-BY-4.0, CC0). Answer with the license name only, or NONE.";
const CODE_LICENSE_PROMPT: &str = "Name the license under which the code described in this \
statement is released (for example MIT, GPL-3.0). Answer with the license name only, or NONE.";

pub struct Agent {
    backend: Box<dyn GeometryBackend>,
    normalizer_config: NormalizerConfig,
    engine: AvailabilityEngine,
    chat: Option<ChatClient>,
    embeddings: Option<EmbeddingsClient>,
    registry: Option<DoiRegistry>,
}

#[derive(Default)]
pub struct AgentBuilder {
    backend: Option<Box<dyn GeometryBackend>>,
    normalizer_config: Option<NormalizerConfig>,
    engine: Option<AvailabilityEngine>,
    chat: Option<ChatClient>,
    embeddings: Option<EmbeddingsClient>,
    registry: Option<DoiRegistry>,
}

impl AgentBuilder {
    pub fn backend(mut self, backend: Box<dyn GeometryBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn normalizer_config(mut self, config: NormalizerConfig) -> Self {
        self.normalizer_config = Some(config);
        self
    }

    pub fn engine(mut self, engine: AvailabilityEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn chat(mut self, chat: ChatClient) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn embeddings(mut self, embeddings: EmbeddingsClient) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn registry(mut self, registry: DoiRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Agent {
        Agent {
            backend: self.backend.unwrap_or_else(|| Box::new(LopdfBackend::new())),
            normalizer_config: self.normalizer_config.unwrap_or_default(),
            engine: self.engine.unwrap_or_default(),
            chat: self.chat,
            embeddings: self.embeddings,
            registry: self.registry,
        }
    }
}

/// Bridges the engine's chat seam onto the configured client. The engine
/// treats any error string as a signal to fall back to heuristics.
struct EngineChat<'a>(Option<&'a ChatClient>);

impl ChatFn for EngineChat<'_> {
    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>> {
        Box::pin(async move {
            match self.0 {
                Some(client) => client
                    .chat(&[ChatMessage::system(system), ChatMessage::user(user)])
                    .await
                    .map_err(|e| e.to_string()),
                None => Err("no extraction service configured".into()),
            }
        })
    }
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub async fn analyze_file(&self, path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let pages = self.backend.load_pages(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.analyze_pages(pages, &name).await
    }

    pub async fn analyze_bytes(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let pages = self.backend.load_pages_from_bytes(bytes)?;
        self.analyze_pages(pages, filename).await
    }

    async fn analyze_pages(
        &self,
        pages: Vec<PageInput>,
        filename: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        // Normalization is CPU-bound and runs off the async executor.
        let config = self.normalizer_config.clone();
        let blocks: Vec<ParagraphBlock> = tokio::task::spawn_blocking(move || {
            TextNormalizer::with_config(config).normalize_pages(&pages)
        })
        .await
        .map_err(|e| AnalysisError::Internal(e.to_string()))?;

        if blocks.is_empty() {
            return Err(AnalysisError::InvalidPdf(
                "no text content after normalization".into(),
            ));
        }

        let full_text = blocks_to_text(&blocks);
        let page_texts = blocks_to_pages(&blocks);
        let mut result = AnalysisResult::new(filename);

        // Title, heuristics first.
        if let Some(candidate) = title::resolve_title(&blocks) {
            result
                .confidence_scores
                .insert("title".into(), candidate.confidence);
            result.title = Some(candidate.title);
            result.title_source = Some(TitleSource::Heuristic);
        }

        let index = self.build_index(&full_text).await?;

        if result.title.is_none() {
            if let Some(t) = self.title_via_model(&full_text).await? {
                result.confidence_scores.insert("title".into(), 0.5);
                result.title = Some(t);
                result.title_source = Some(TitleSource::Llm);
            }
        }

        let finding = self.resolve_doi(&full_text, index.as_ref(), result.title.as_deref()).await?;
        if let Some(finding) = finding {
            if finding.origin == DoiOrigin::Enriched {
                if let Some(ref verified) = finding.verified_title {
                    result.title = Some(verified.clone());
                    result.title_source = Some(TitleSource::Enriched);
                }
            }
            result.confidence_scores.insert("doi".into(), finding.confidence);
            result.doi = Some(finding.doi);
        }

        // Availability extraction. The engine never errors; a dead service
        // degrades to its heuristic fallback.
        let extraction = self
            .engine
            .extract(&page_texts, &EngineChat(self.chat.as_ref()))
            .await;

        if let Some(data) = extraction.data {
            let (statement, links) = self.finish_statement(&data, &full_text, HeadingLabel::Data);
            result.confidence_scores.insert("data".into(), data.confidence);
            result.data_statement = Some(statement);
            result.data_links = links;
        }
        if let Some(code) = extraction.code {
            let (statement, links) = self.finish_statement(&code, &full_text, HeadingLabel::Code);
            result.confidence_scores.insert("code".into(), code.confidence);
            result.code_statement = Some(statement);
            result.code_links = links;
        }
        result.diagnostics = extraction.diagnostics;

        result.data_sharing_license = self
            .extract_license(result.data_statement.as_deref(), DATA_LICENSE_PROMPT)
            .await;
        result.code_license = self
            .extract_license(result.code_statement.as_deref(), CODE_LICENSE_PROMPT)
            .await;

        Ok(result)
    }

    /// Expand the statement to readable context and merge in any further
    /// allow-listed links that context adds.
    fn finish_statement(
        &self,
        statement: &StatementResult,
        full_text: &str,
        label: HeadingLabel,
    ) -> (String, Vec<String>) {
        let expanded = expand_statement_context(&statement.statement, full_text);
        let mut links = statement.links.clone();
        for link in urls::extract_links(&expanded) {
            if link_allowed(&link, label) && !links.iter().any(|l| l.eq_ignore_ascii_case(&link)) {
                links.push(link);
            }
        }
        (expanded, links)
    }

    async fn build_index(&self, full_text: &str) -> Result<Option<VectorIndex>, AnalysisError> {
        let Some(ref embeddings) = self.embeddings else {
            return Ok(None);
        };
        let chunks = chunk_text(full_text, CHUNK_SIZE, CHUNK_OVERLAP);
        if chunks.is_empty() {
            return Ok(None);
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embeddings.embed(&texts).await?;
        Ok(VectorIndex::new(chunks, vectors))
    }

    async fn title_via_model(&self, full_text: &str) -> Result<Option<String>, AnalysisError> {
        let Some(ref chat) = self.chat else {
            return Ok(None);
        };
        let head: String = full_text.chars().take(CHUNK_SIZE).collect();
        let reply = chat
            .chat(&[
                ChatMessage::system(TITLE_PROMPT),
                ChatMessage::user(head),
            ])
            .await?;
        let candidate = reply.trim().trim_matches('"').to_string();
        if candidate.eq_ignore_ascii_case("none")
            || candidate.chars().count() < 10
            || candidate.chars().count() > 300
        {
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    /// DOI resolution: front-matter regex, then a guarded model fallback
    /// over retrieved chunks, then a whole-document sweep, then registry
    /// verification or title-search enrichment.
    async fn resolve_doi(
        &self,
        full_text: &str,
        index: Option<&VectorIndex>,
        document_title: Option<&str>,
    ) -> Result<Option<DoiFinding>, AnalysisError> {
        let mut finding = match doi::harvest_front_matter(full_text) {
            Some(d) => Some(DoiFinding {
                doi: d,
                confidence: doi::CONFIDENCE_FRONT_MATTER,
                origin: DoiOrigin::FrontMatter,
                verified_title: None,
            }),
            None => self.doi_via_model(full_text, index).await?,
        };

        if finding.is_none() {
            finding = doi::sweep(full_text).map(|d| DoiFinding {
                doi: d,
                confidence: doi::CONFIDENCE_SWEEP,
                origin: DoiOrigin::Sweep,
                verified_title: None,
            });
        }

        let Some(ref registry) = self.registry else {
            return Ok(finding);
        };
        match finding {
            Some(mut f) => {
                doi::verify_against_registry(&mut f, document_title, registry).await;
                Ok(Some(f))
            }
            None => match document_title {
                Some(title) => Ok(doi::enrich_from_title(title, registry).await),
                None => Ok(None),
            },
        }
    }

    async fn doi_via_model(
        &self,
        full_text: &str,
        index: Option<&VectorIndex>,
    ) -> Result<Option<DoiFinding>, AnalysisError> {
        let (Some(chat), Some(embeddings), Some(index)) =
            (self.chat.as_ref(), self.embeddings.as_ref(), index)
        else {
            return Ok(None);
        };

        let query = embeddings
            .embed(&["doi digital object identifier of this article".to_string()])
            .await?;
        let Some(query) = query.first() else {
            return Ok(None);
        };
        let snippets: Vec<String> = index
            .search(query, 2)
            .into_iter()
            .map(|c| c.text.clone())
            .collect();
        if snippets.is_empty() {
            return Ok(None);
        }

        let reply = chat
            .chat(&[
                ChatMessage::system(DOI_PROMPT),
                ChatMessage::user(snippets.join("\n\n")),
            ])
            .await?;
        let Some(candidate) = doi::doi_from_reply(&reply) else {
            return Ok(None);
        };
        // Hallucination guard: discard DOIs the document never mentions.
        if !doi::occurs_in_document(&candidate, full_text) {
            tracing::debug!(doi = %candidate, "model proposed a DOI absent from the document");
            return Ok(None);
        }
        Ok(Some(DoiFinding {
            doi: candidate,
            confidence: doi::CONFIDENCE_LLM,
            origin: DoiOrigin::Llm,
            verified_title: None,
        }))
    }

    /// Best-effort license extraction over an accepted statement. A
    /// failing call only costs the field, not the analysis.
    async fn extract_license(&self, statement: Option<&str>, prompt: &str) -> Option<String> {
        let chat = self.chat.as_ref()?;
        let statement = statement?;
        match chat
            .chat(&[ChatMessage::system(prompt), ChatMessage::user(statement)])
            .await
        {
            Ok(reply) => {
                let license = reply.trim().trim_matches('"').to_string();
                if license.len() < 5 || license.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(license)
                }
            }
            Err(err) => {
                tracing::warn!(%err, "license extraction failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openavail_normalizer::NormalizerError;

    /// Backend serving fixed page text, so analysis runs without a PDF.
    struct FixedPages(Vec<String>);

    impl GeometryBackend for FixedPages {
        fn load_pages(&self, _path: &Path) -> Result<Vec<PageInput>, NormalizerError> {
            Ok(self.0.iter().cloned().map(PageInput::Text).collect())
        }

        fn load_pages_from_bytes(&self, _bytes: &[u8]) -> Result<Vec<PageInput>, NormalizerError> {
            self.load_pages(Path::new("unused"))
        }
    }

    fn paper_pages() -> Vec<String> {
        vec![
            "Beetle community turnover along elevation gradients\n\nJane Doe, Department of \
             Ecology, University of Elsewhere\n\nhttps://doi.org/10.1234/eco.2021.55\n\n\
             Abstract text goes here."
                .to_string(),
            "DATA AVAILABILITY\n\nAll data are available at https://zenodo.org/record/12345."
                .to_string(),
        ]
    }

    fn offline_agent(pages: Vec<String>) -> Agent {
        Agent::builder().backend(Box::new(FixedPages(pages))).build()
    }

    #[tokio::test]
    async fn offline_analysis_uses_heuristics_end_to_end() {
        let agent = offline_agent(paper_pages());
        let result = agent.analyze_bytes(b"ignored", "paper.pdf").await.unwrap();

        assert_eq!(result.source_file, "paper.pdf");
        assert_eq!(
            result.title.as_deref(),
            Some("Beetle community turnover along elevation gradients")
        );
        assert_eq!(result.title_source, Some(TitleSource::Heuristic));
        assert_eq!(result.doi.as_deref(), Some("10.1234/eco.2021.55"));

        let data = result.data_statement.expect("data statement");
        assert!(data.contains("zenodo.org/record/12345"));
        assert_eq!(result.data_links, vec!["https://zenodo.org/record/12345"]);
        assert!(result.confidence_scores["data"] <= 0.6, "fallback cap");
        assert!(result.diagnostics.data_fallback);
    }

    #[tokio::test]
    async fn statement_links_survive_context_expansion() {
        let agent = offline_agent(vec![
            "Data availability: Sequencing reads are deposited at \
             https://www.ncbi.nlm.nih.gov/sra/PRJ123 and scripts at \
             https://github.com/lab/beetles."
                .to_string(),
        ]);
        let result = agent.analyze_bytes(b"ignored", "p.pdf").await.unwrap();
        assert!(result
            .data_links
            .iter()
            .any(|l| l.contains("ncbi.nlm.nih.gov")));
    }

    #[tokio::test]
    async fn empty_document_is_invalid_pdf() {
        let agent = offline_agent(vec!["".to_string()]);
        let err = agent.analyze_bytes(b"ignored", "p.pdf").await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPdf(_)));
    }

    #[tokio::test]
    async fn reference_doi_is_not_claimed_without_front_matter() {
        let agent = offline_agent(vec![
            "An untitled note with data available upon reasonable request."
                .to_string(),
            "References\n\nSmith J (2020) Other paper. doi:10.9999/someone.else".to_string(),
        ]);
        let result = agent.analyze_bytes(b"ignored", "p.pdf").await.unwrap();
        // Only the sweep finds it, at reduced confidence.
        assert_eq!(result.doi.as_deref(), Some("10.9999/someone.else"));
        assert!(result.confidence_scores["doi"] <= 0.5);
    }
}
