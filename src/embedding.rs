//! Embedding vectors and similarity scoring.
//!
//! Reference embeddings and logo-crop embeddings share this representation;
//! the matcher only ever compares them through `similarity`.

use serde::{Deserialize, Serialize};

/// Feature vector produced by the logo embedding model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Cosine similarity between two embeddings, in [-1, 1].
    ///
    /// Zero-norm vectors compare as 0.0 rather than NaN.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 { dot / denom } else { 0.0 }
    }

    /// Similarity clamped to [0, 1] for reporting as a confidence score.
    pub fn confidence_against(&self, other: &Embedding) -> f32 {
        self.similarity(other).clamp(0.0, 1.0)
    }
}
