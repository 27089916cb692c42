/// Text to fixed-width vector. Implementations must be deterministic: the
/// same text always yields bit-identical output.
pub trait Embedder: Send + Sync {
    /// Versioned identifier stored alongside every vector this model produces.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}
