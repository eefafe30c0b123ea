//! Embedding provider seam
//!
//! The embedding model itself is an external service. This module defines
//! the trait the engine calls, the input normalization every provider must
//! apply, and a deterministic lexical embedder used in tests and offline
//! runs.

use async_trait::async_trait;

use crate::errors::Result;

/// Default embedding dimension
pub const EMBEDDING_DIM: usize = 768;

/// Provider of fixed-dimension text embeddings
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a fixed-dimension vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimension, constant for the provider's lifetime
    fn dimension(&self) -> usize;
}

/// Normalize text before embedding: empty and near-empty inputs get a
/// fixed placeholder so the vector is well-defined. The stored content is
/// never altered, only what the model sees.
pub fn prepare_embedding_text(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "empty content".to_string();
    }
    if trimmed.len() < 3 {
        return format!("short content: {}", trimmed);
    }
    trimmed.to_string()
}

/// Deterministic lexical embedder: hashed bag of stems, prefixes, and
/// character trigrams, L2-normalized. No model, no network; cosine
/// similarity tracks lexical overlap closely enough for tests and
/// degraded offline operation.
pub struct HashedEmbedder {
    dim: usize,
}

/// Default bucket count; wide enough that feature collisions stay noise
const HASH_BUCKETS: usize = 8192;

/// Stem features dominate prefix/trigram features in the cosine
const WORD_WEIGHT: f32 = 2.0;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "i",
    "in", "is", "it", "my", "of", "on", "or", "that", "the", "this", "to",
    "was", "we", "with", "you",
];

impl HashedEmbedder {
    pub fn new() -> Self {
        Self { dim: HASH_BUCKETS }
    }

    pub fn with_dimension(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];

        for token in tokenize(text) {
            let stem = stem(&token);
            if stem.is_empty() {
                continue;
            }

            bump(&mut vector, &stem, WORD_WEIGHT, self.dim);

            let chars: Vec<char> = stem.chars().collect();

            // 4-char prefix links inflection variants the stemmer misses
            if chars.len() > 4 {
                let prefix: String = chars.iter().take(4).collect();
                bump(&mut vector, &format!("^{}", prefix), 1.0, self.dim);
            }

            // Character trigrams for partial overlap
            if chars.len() >= 3 {
                for window in chars.windows(3) {
                    let gram: String = window.iter().collect();
                    bump(&mut vector, &format!("#{}", gram), 1.0, self.dim);
                }
            }
        }

        // L2 normalize so cosine similarity equals the dot product
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for HashedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let prepared = prepare_embedding_text(text);
        Ok(self.embed_sync(&prepared))
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Crude suffix stripping; enough to align "preference"/"prefer",
/// "replies"/"reply" without a stemming crate
fn stem(token: &str) -> String {
    let t = token;
    for (suffix, replacement) in [
        ("ences", ""),
        ("ence", ""),
        ("ances", ""),
        ("ance", ""),
        ("ies", "y"),
        ("ing", ""),
        ("ed", ""),
        ("es", ""),
        ("s", ""),
    ] {
        if t.len() > suffix.len() + 2 {
            if let Some(base) = t.strip_suffix(suffix) {
                return format!("{}{}", base, replacement);
            }
        }
    }
    t.to_string()
}

fn bump(vector: &mut [f32], feature: &str, weight: f32, dim: usize) {
    let bucket = (fnv1a(feature.as_bytes()) % dim as u64) as usize;
    vector[bucket] += weight;
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Cosine similarity between two vectors of equal length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}
