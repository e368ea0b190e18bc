use std::sync::Arc;

use tracing::debug;

use crate::embed::Encoder;
use crate::error::{ChatError, Result};
use crate::model::{Embedding, SimilarityResult};

/// Cosine of the angle between `a` and `b`. Mismatched lengths and
/// zero-norm inputs score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norms = dot(a, a).sqrt() * dot(b, b).sqrt();
    if norms > 0.0 {
        dot(a, b) / norms
    } else {
        0.0
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Sorts by descending score, breaking ties by ascending candidate index,
/// and keeps at most `k`.
pub fn top_k(mut scored: Vec<SimilarityResult>, k: usize) -> Vec<SimilarityResult> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index)));
    scored.truncate(k);
    scored
}

#[derive(Clone)]
pub struct SimilarityRanker {
    encoder: Arc<dyn Encoder>,
}

impl SimilarityRanker {
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }

    /// Encodes the query and every candidate in a single batch.
    fn embed<S: AsRef<str>>(
        &self,
        query: &str,
        candidates: &[S],
    ) -> Result<(Embedding, Vec<Embedding>)> {
        if query.trim().is_empty() {
            return Err(ChatError::InvalidInput("query must not be empty".to_string()));
        }
        if candidates.is_empty() {
            return Err(ChatError::InvalidInput(
                "at least one candidate is required".to_string(),
            ));
        }

        let batch: Vec<&str> = std::iter::once(query)
            .chain(candidates.iter().map(|c| c.as_ref()))
            .collect();
        let mut embeddings = self.encoder.encode(&batch)?;
        if embeddings.len() != batch.len() {
            return Err(ChatError::Encode(format!(
                "expected {} embeddings, encoder returned {}",
                batch.len(),
                embeddings.len()
            )));
        }

        let candidate_embeddings = embeddings.split_off(1);
        let query_embedding = embeddings.pop().unwrap_or_default();
        Ok((query_embedding, candidate_embeddings))
    }

    /// Similarity of `query` to each candidate, aligned with `candidates`.
    pub fn score_all<S: AsRef<str>>(&self, query: &str, candidates: &[S]) -> Result<Vec<f32>> {
        let (q, embedded) = self.embed(query, candidates)?;
        Ok(embedded.iter().map(|c| cosine_similarity(&q, c)).collect())
    }

    /// The `top_k` most similar candidates, best first. A `top_k` larger
    /// than the candidate list returns every candidate.
    pub fn rank<S: AsRef<str>>(
        &self,
        query: &str,
        candidates: &[S],
        top_k: usize,
    ) -> Result<Vec<SimilarityResult>> {
        if top_k == 0 {
            return Err(ChatError::InvalidInput("top_k must be at least 1".to_string()));
        }

        debug!(candidates = candidates.len(), top_k, "ranking candidates");
        let scores = self.score_all(query, candidates)?;
        let scored = scores
            .into_iter()
            .zip(candidates)
            .enumerate()
            .map(|(index, (score, text))| SimilarityResult {
                index,
                text: text.as_ref().to_string(),
                score,
            })
            .collect();

        Ok(self::top_k(scored, top_k))
    }
}
