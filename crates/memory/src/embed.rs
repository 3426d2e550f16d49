//! Embedding contract and vector math.
//!
//! Embedders must return L2-normalised vectors, so cosine similarity is
//! a plain dot product.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use la_domain::error::Result;

/// Text → vector collaborator.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
    fn dims(&self) -> usize;
}

// ── Vector math ────────────────────────────────────────────────────

/// Scale a vector to unit length. A zero vector is left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity for normalised vectors. Mismatched lengths score 0.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// HashEmbedder
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Deterministic reference embedder: hashes lowercase tokens into a
/// fixed-dimension bag-of-words vector, then normalises. No model
/// quality, but stable across processes — shared tokens between two
/// texts always produce positive similarity, which is what the memory
/// tests and offline deployments need.
pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn token_slot(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[0..8]);
        let idx = u64::from_le_bytes(bytes) as usize % self.dims;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (idx, sign)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '@' && c != '_')
            .filter(|t| !t.is_empty())
        {
            let (idx, sign) = self.token_slot(token);
            v[idx] += sign;
        }
        l2_normalize(&mut v);
        Ok(v)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeddings_are_deterministic_and_normalised() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("send 50 USDC to @alice").await.unwrap();
        let b = embedder.embed("send 50 USDC to @alice").await.unwrap();
        assert_eq!(a, b);

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn related_texts_score_higher_than_unrelated() {
        let embedder = HashEmbedder::default();
        let query = embedder.embed("send money to @alice").await.unwrap();
        let related = embedder
            .embed("Action: send_money Observation: sent to @alice")
            .await
            .unwrap();
        let unrelated = embedder
            .embed("quarterly spending on groceries was high")
            .await
            .unwrap();
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn dot_handles_length_mismatch() {
        assert_eq!(dot(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
