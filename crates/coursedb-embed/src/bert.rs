use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use coursedb_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

/// Sentence-transformer checkpoint (BERT encoder + mean pooling), loaded
/// from a local directory holding `config.json`, `tokenizer.json` and either
/// `model.safetensors` or `pytorch_model.bin`.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path, model_id: &str, max_len: usize) -> Result<Self> {
        let started = Instant::now();
        let device = select_device();
        info!(model = model_id, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config_text = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&config_text).with_context(|| format!("parsing {}", config_path.display()))?;
        let dim = config.hidden_size;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).context("building BERT encoder")?;

        info!(model = model_id, dim, elapsed_ms = started.elapsed().as_millis() as u64, "embedding model ready");
        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let (ids, type_ids, mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&ids, &type_ids, Some(&mask))?;
        let pooled = masked_mean_l2(&hidden, &mask)?;
        let row = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        Ok(row)
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device).with_context(|| format!("reading {}", safetensors.display()));
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&pickle).with_context(|| format!("reading {}", pickle.display()))?;
    Ok(weights.into_iter().collect())
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> &str { &self.model_id }

    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_len }

    /// Each text runs as its own unpadded sequence, so a vector never depends
    /// on which batch its text happened to share.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let started = Instant::now();
        let out = texts.iter().map(|t| self.embed_one(t)).collect::<Result<Vec<_>>>()?;
        debug!(count = texts.len(), elapsed_ms = started.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}

impl Drop for BertEmbedder {
    fn drop(&mut self) { debug!(model = %self.model_id, "releasing embedding model"); }
}
