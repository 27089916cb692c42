use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use coursedb_core::traits::Embedder;

/// Feature-hashing embedder: lowercased word tokens hashed into `dim`
/// buckets, then L2-normalised. No model files, fully deterministic; used
/// by tests and as an offline fallback.
pub struct HashEmbedder {
    dim: usize,
    model_id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, model_id: format!("hash-xx64-{}", dim) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 { return v; }
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 { for x in &mut v { *x /= norm; } }
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let e = HashEmbedder::new(32);
        assert_eq!(e.embed_text("Machine Learning!"), e.embed_text("machine learning"));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let e = HashEmbedder::new(8);
        assert!(e.embed_text("  ").iter().all(|x| *x == 0.0));
    }
}
