//! Company policy retrieval: passages, embeddings, cosine top-k.

use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;

use crate::embedding::cosine_similarity;
use crate::ports::EmbeddingPort;

pub const DEFAULT_TOP_K: usize = 2;
pub const MAX_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    Uninitialized,
    Loading,
    Ready,
    Empty,
}

/// One passage of the policy document with its embedding.
#[derive(Debug, Clone)]
pub struct PolicyChunk {
    pub index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyMatch {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyAnswer {
    Passages(Vec<PolicyMatch>),
    Unavailable,
}

enum Inner {
    Uninitialized,
    Loading,
    Ready(Arc<Vec<PolicyChunk>>),
    Empty,
}

impl Inner {
    fn state(&self) -> PolicyState {
        match self {
            Inner::Uninitialized => PolicyState::Uninitialized,
            Inner::Loading => PolicyState::Loading,
            Inner::Ready(_) => PolicyState::Ready,
            Inner::Empty => PolicyState::Empty,
        }
    }
}

pub struct PolicyStore {
    embedder: Arc<dyn EmbeddingPort>,
    top_k: usize,
    inner: RwLock<Inner>,
}

impl PolicyStore {
    pub fn new(embedder: Arc<dyn EmbeddingPort>, top_k: usize) -> Self {
        Self {
            embedder,
            top_k: top_k.clamp(1, MAX_TOP_K),
            inner: RwLock::new(Inner::Uninitialized),
        }
    }

    pub fn state(&self) -> PolicyState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn passage_count(&self) -> usize {
        match &*self.inner.read().unwrap_or_else(PoisonError::into_inner) {
            Inner::Ready(chunks) => chunks.len(),
            _ => 0,
        }
    }

    /// Split, embed and index `document`. Only the first call has any effect.
    pub async fn load(&self, document: Option<&str>) -> PolicyState {
        {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            if !matches!(*inner, Inner::Uninitialized) {
                let current = inner.state();
                log::warn!("Policy store already {:?}; ignoring reload", current);
                return current;
            }
            *inner = Inner::Loading;
        }

        let passages = document.map(split_passages).unwrap_or_default();
        let next = if passages.is_empty() {
            log::warn!("Policy document missing or empty; policy answers unavailable");
            Inner::Empty
        } else {
            let texts: Vec<&str> = passages.iter().map(String::as_str).collect();
            match self.embedder.embed_batch(&texts).await {
                Ok(vectors) if vectors.len() == passages.len() => {
                    let chunks = passages
                        .into_iter()
                        .zip(vectors)
                        .enumerate()
                        .map(|(index, (text, embedding))| PolicyChunk { index, text, embedding })
                        .collect::<Vec<_>>();
                    log::info!(
                        "Policy store ready: {} passages via {} embeddings",
                        chunks.len(),
                        self.embedder.backend_name()
                    );
                    Inner::Ready(Arc::new(chunks))
                }
                Ok(vectors) => {
                    log::error!(
                        "Embedding backend returned {} vectors for {} passages",
                        vectors.len(),
                        passages.len()
                    );
                    Inner::Empty
                }
                Err(e) => {
                    log::error!("Failed to embed policy document: {}", e);
                    Inner::Empty
                }
            }
        };

        let state = next.state();
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = next;
        state
    }

    /// Top-k passages for `question`, best first.
    pub async fn query(&self, question: &str) -> PolicyAnswer {
        let chunks = match &*self.inner.read().unwrap_or_else(PoisonError::into_inner) {
            Inner::Ready(chunks) => Arc::clone(chunks),
            _ => return PolicyAnswer::Unavailable,
        };

        let query = match self.embedder.embed(question).await {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Policy query embedding failed: {}", e);
                return PolicyAnswer::Unavailable;
            }
        };

        let mut scored: Vec<PolicyMatch> = chunks
            .iter()
            .map(|chunk| PolicyMatch {
                index: chunk.index,
                text: chunk.text.clone(),
                score: cosine_similarity(&query, &chunk.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        scored.truncate(self.top_k);
        PolicyAnswer::Passages(scored)
    }
}

/// Passages are blocks separated by one or more blank lines.
pub fn split_passages(document: &str) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in document.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                passages.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        passages.push(current.join("\n"));
    }
    passages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_lines() {
        let doc = "Refunds:\n72h before: 90%\n\n\n  \nBaggage: 20 kg\r\n\r\nPets are not allowed.\n";
        let passages = split_passages(doc);
        assert_eq!(
            passages,
            vec!["Refunds:\n72h before: 90%", "Baggage: 20 kg", "Pets are not allowed."]
        );
        assert!(split_passages(" \n\n\t\n").is_empty());
    }
}
