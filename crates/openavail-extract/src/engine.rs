//! The hybrid extraction engine: heuristic ranking feeds a single model
//! call, whose answer is validated against the source text; any failure
//! along the way degrades to a deterministic heuristic result.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::prompt::{build_user_prompt, SYSTEM_PROMPT};
use crate::rank::{rank_contexts, RankedContext};
use crate::segment::{segment_pages, HeadingLabel};
use crate::validate::{link_allowed, parse_response, passes_keyword_gate, validate_side};
use crate::urls;

/// Injected text-generation call.
pub trait ChatFn: Send + Sync {
    fn chat<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + 'a>>;
}

/// One accepted availability statement.
#[derive(Debug, Clone, Serialize)]
pub struct StatementResult {
    pub statement: String,
    pub links: Vec<String>,
    pub confidence: f64,
    pub fallback: bool,
    #[serde(skip)]
    pub source_context: String,
    pub source_index: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub data_contexts: usize,
    pub code_contexts: usize,
    pub data_fallback: bool,
    pub code_fallback: bool,
    pub chat_error: Option<String>,
    pub parse_failed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AvailabilityExtraction {
    pub data: Option<StatementResult>,
    pub code: Option<StatementResult>,
    pub diagnostics: Diagnostics,
}

impl AvailabilityExtraction {
    pub fn data_links(&self) -> &[String] {
        self.data.as_ref().map(|s| s.links.as_slice()).unwrap_or(&[])
    }

    pub fn code_links(&self) -> &[String] {
        self.code.as_ref().map(|s| s.links.as_slice()).unwrap_or(&[])
    }
}

pub struct AvailabilityEngine {
    config: EngineConfig,
}

impl Default for AvailabilityEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AvailabilityEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Extract data and code availability statements from normalized page
    /// texts. Never errors: a failed or unusable model call degrades to
    /// the heuristic fallback for the affected side.
    pub async fn extract(&self, pages: &[String], chat: &dyn ChatFn) -> AvailabilityExtraction {
        let paragraphs = segment_pages(pages);
        let data_ctx = rank_contexts(&paragraphs, HeadingLabel::Data, &self.config);
        let code_ctx = rank_contexts(&paragraphs, HeadingLabel::Code, &self.config);

        let mut out = AvailabilityExtraction {
            diagnostics: Diagnostics {
                data_contexts: data_ctx.len(),
                code_contexts: code_ctx.len(),
                ..Diagnostics::default()
            },
            ..Default::default()
        };

        if data_ctx.is_empty() && code_ctx.is_empty() {
            return out;
        }

        let user = build_user_prompt(&data_ctx, &code_ctx);
        let parsed = match chat.chat(SYSTEM_PROMPT, &user).await {
            Ok(reply) => {
                let parsed = parse_response(&reply);
                if parsed.is_none() {
                    tracing::debug!("extraction reply was not parseable JSON, falling back");
                    out.diagnostics.parse_failed = true;
                }
                parsed
            }
            Err(err) => {
                tracing::warn!(%err, "extraction call failed, falling back to heuristics");
                out.diagnostics.chat_error = Some(err);
                None
            }
        };

        if let Some(ref resp) = parsed {
            out.data = validate_side(&resp.data, &data_ctx, HeadingLabel::Data, &self.config)
                .map(|v| StatementResult {
                    statement: v.statement,
                    links: v.links,
                    confidence: v.confidence,
                    fallback: false,
                    source_context: v.source_context,
                    source_index: v.source_index,
                });
            out.code = validate_side(&resp.code, &code_ctx, HeadingLabel::Code, &self.config)
                .map(|v| StatementResult {
                    statement: v.statement,
                    links: v.links,
                    confidence: v.confidence,
                    fallback: false,
                    source_context: v.source_context,
                    source_index: v.source_index,
                });
        }

        if out.data.is_none() {
            out.data = self.fallback(&data_ctx, HeadingLabel::Data);
            out.diagnostics.data_fallback = out.data.is_some();
        }
        if out.code.is_none() {
            out.code = self.fallback(&code_ctx, HeadingLabel::Code);
            out.diagnostics.code_fallback = out.code.is_some();
        }
        out
    }

    /// Deterministic fallback: take the best-ranked context containing an
    /// availability keyword, trimmed to the matching sentence(s).
    fn fallback(&self, contexts: &[RankedContext], label: HeadingLabel) -> Option<StatementResult> {
        let best = contexts
            .iter()
            .find(|ctx| passes_keyword_gate(&ctx.text, label))?;

        let statement = trim_to_matching_sentences(&best.text, label);
        if statement.is_empty() {
            return None;
        }

        let links: Vec<String> = urls::extract_links(&statement)
            .into_iter()
            .filter(|l| link_allowed(l, label))
            .collect();

        let confidence = (best.score / 8.0).min(self.config.fallback_confidence_cap);
        Some(StatementResult {
            statement,
            links,
            confidence,
            fallback: true,
            source_context: best.text.clone(),
            source_index: best.index,
        })
    }
}

/// Keep the sentences that carry an availability keyword, pulling in the
/// following sentence when it holds a link. Capped at 600 chars.
fn trim_to_matching_sentences(text: &str, label: HeadingLabel) -> String {
    let sentences = split_sentences(text);
    let mut keep: Vec<bool> = sentences
        .iter()
        .map(|s| passes_keyword_gate(s, label))
        .collect();
    for i in 0..sentences.len() {
        if keep[i] && i + 1 < sentences.len() && sentences[i + 1].contains("http") {
            keep[i + 1] = true;
        }
    }

    let mut out = String::new();
    for (s, k) in sentences.iter().zip(&keep) {
        if !*k {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(s.trim());
        if out.len() >= 600 {
            let mut cut = 600;
            while !out.is_char_boundary(cut) {
                cut -= 1;
            }
            out.truncate(cut);
            break;
        }
    }
    out
}

/// Sentence splitter tolerant of URLs: a boundary is `.`/`!`/`?` followed
/// by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map(|n| n.is_whitespace()).unwrap_or(true) {
            let s = current.trim().to_string();
            if !s.is_empty() {
                out.push(s);
            }
            current.clear();
        }
    }
    let tail = current.trim().to_string();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}
