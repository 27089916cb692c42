use std::sync::Arc;

use coursedb_core::config::Settings;
use coursedb_core::traits::Embedder;
use coursedb_core::{EmbeddingVector, Error, Result};
use tracing::info;

use crate::bert::BertEmbedder;
use crate::hash::HashEmbedder;

/// Guards an [`Embedder`] with the configured dimension: a model whose width
/// differs is refused up front, and every produced vector is checked again.
#[derive(Clone)]
pub struct EmbeddingEncoder {
    embedder: Arc<dyn Embedder>,
    dim: usize,
}

impl EmbeddingEncoder {
    pub fn new(embedder: Arc<dyn Embedder>, configured_dim: usize) -> Result<Self> {
        if embedder.dim() != configured_dim {
            return Err(Error::config(format!(
                "model {} produces {}-d vectors but the index is configured for {}",
                embedder.model_id(),
                embedder.dim(),
                configured_dim
            )));
        }
        Ok(Self { embedder, dim: configured_dim })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(load_embedder(settings)?, settings.embedding.dimension)
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn model_id(&self) -> &str { self.embedder.model_id() }

    pub fn encode(&self, text: &str) -> Result<EmbeddingVector> {
        let mut out = self.encode_batch(&[text.to_string()])?;
        out.pop().ok_or_else(|| Error::Encoding("model returned no vector".into()))
    }

    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let raw = self.embedder.embed_batch(texts).map_err(|e| Error::Encoding(format!("{:#}", e)))?;
        if raw.len() != texts.len() {
            return Err(Error::Encoding(format!("model returned {} vectors for {} texts", raw.len(), texts.len())));
        }
        raw.into_iter()
            .map(|v| {
                if v.len() != self.dim {
                    return Err(Error::config(format!("model produced a {}-d vector, expected {}", v.len(), self.dim)));
                }
                Ok(EmbeddingVector::new(v))
            })
            .collect()
    }
}

/// `APP_USE_FAKE_EMBEDDINGS=1` or `embedding.model = "hash"` selects the
/// hash embedder; otherwise the BERT checkpoint under `embedding.model_dir`.
pub fn load_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let dim = settings.embedding.dimension;
    if use_fake || settings.embedding.model == "hash" {
        info!(dim, "using hash embedder");
        return Ok(Arc::new(HashEmbedder::new(dim)));
    }
    let model_dir = settings.model_dir();
    if !model_dir.is_dir() {
        return Err(Error::config(format!("embedding model directory {} does not exist", model_dir.display())));
    }
    let model = BertEmbedder::load(&model_dir, &settings.embedding.model_id, settings.embedding.max_len)
        .map_err(|e| Error::config(format!("failed to load embedding model: {:#}", e)))?;
    Ok(Arc::new(model))
}
