//! Overlapping text chunks and a per-document cosine-similarity index.
//! The index is built fresh for each document and never shared.

/// Chunk size and overlap in characters.
pub const CHUNK_SIZE: usize = 1800;
pub const CHUNK_OVERLAP: usize = 250;

#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
}

/// Split text into overlapping character-window chunks, breaking at the
/// nearest whitespace so words stay intact.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![];
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let mut end = (start + size).min(chars.len());
        if end < chars.len() {
            // Back up to the last whitespace, at most 100 chars, so words
            // stay intact.
            let floor = end.saturating_sub(100).max(start + 1);
            while end > floor && !chars[end - 1].is_whitespace() {
                end -= 1;
            }
        }
        let text: String = chars[start..end].iter().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(Chunk {
                text: trimmed.to_string(),
                index: out.len(),
            });
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    out
}

/// A built similarity index over one document's chunks.
pub struct VectorIndex {
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Pair chunks with their embeddings. Lengths must match.
    pub fn new(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Option<Self> {
        if chunks.len() != vectors.len() {
            return None;
        }
        Some(Self { chunks, vectors })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Top-k chunks by cosine similarity to the query vector.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<&Chunk> {
        let mut scored: Vec<(f64, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (cosine(query, v), i))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored
            .into_iter()
            .take(k)
            .map(|(_, i)| &self.chunks[i])
            .collect()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += (*x as f64) * (*y as f64);
        na += (*x as f64) * (*x as f64);
        nb += (*y as f64) * (*y as f64);
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}
