//! Local, deterministic text embeddings.
//!
//! Feature hashing: lowercase word tokens and character trigrams are hashed
//! with blake3 into a fixed number of buckets, then L2-normalised. No model
//! download and no network, and the same text always maps to the same vector.

use async_trait::async_trait;
use safar_types::Result;

use crate::ports::EmbeddingPort;

pub const DEFAULT_DIMENSION: usize = 256;

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(8),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];
        let lowered = text.to_lowercase();

        for token in tokens(&lowered) {
            self.accumulate(&mut vector, "w", token, 1.0);

            let chars: Vec<char> = token.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let gram: String = window.iter().collect();
                    self.accumulate(&mut vector, "g", &gram, 0.5);
                }
            }
        }

        l2_normalize(&mut vector);
        vector
    }

    fn accumulate(&self, vector: &mut [f32], namespace: &str, feature: &str, weight: f32) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(namespace.as_bytes());
        hasher.update(feature.as_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();

        let bucket = u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) % self.dimension as u64;
        // sign bit keeps unrelated collisions from always adding up
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket as usize] += sign * weight;
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

#[async_trait]
impl EmbeddingPort for HashingEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn backend_name(&self) -> &str {
        "hashing"
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}
