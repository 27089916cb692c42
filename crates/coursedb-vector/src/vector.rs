use coursedb_core::{EmbeddingVector, Error, Result};

/// Exhaustive cosine index over positional slots. A slot may be empty (a
/// course without a vector); empty slots never appear in results.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    vectors: Vec<Option<Vec<f32>>>,
    norms: Vec<f32>,
    count: usize,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self { Self { dim, vectors: Vec::new(), norms: Vec::new(), count: 0 } }

    pub fn dim(&self) -> usize { self.dim }

    /// Number of slots, including empty ones.
    pub fn len(&self) -> usize { self.vectors.len() }

    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    /// Number of slots holding a vector.
    pub fn vector_count(&self) -> usize { self.count }

    pub fn has_vector(&self, slot: usize) -> bool { matches!(self.vectors.get(slot), Some(Some(_))) }

    pub fn push(&mut self, vector: Option<EmbeddingVector>) -> Result<usize> {
        let slot = self.vectors.len();
        match vector {
            Some(v) => {
                if v.dim() != self.dim {
                    return Err(Error::config(format!("vector for slot {} has {} dimensions, expected {}", slot, v.dim(), self.dim)));
                }
                self.norms.push(v.norm());
                self.vectors.push(Some(v.into_inner()));
                self.count += 1;
            }
            None => {
                self.norms.push(0.0);
                self.vectors.push(None);
            }
        }
        Ok(slot)
    }

    /// `k` nearest slots by cosine distance, ascending; equal distances keep
    /// slot order.
    pub fn nearest(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 { return Err(Error::invalid("k must be at least 1")); }
        if query.dim() != self.dim {
            return Err(Error::config(format!("query vector has {} dimensions, index expects {}", query.dim(), self.dim)));
        }
        if self.count == 0 { return Err(Error::EmptyIndex); }

        let q = query.as_slice();
        let q_norm = query.norm();
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter_map(|(slot, v)| v.as_ref().map(|v| (slot, cosine_distance(q, q_norm, v, self.norms[slot]))))
            .collect();
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }
}

/// `1 - cos(a, b)`; a zero-norm side counts as similarity 0.
pub fn cosine_distance(a: &[f32], a_norm: f32, b: &[f32], b_norm: f32) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 { return 1.0; }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    1.0 - (dot / (a_norm * b_norm)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(values: &[f32]) -> EmbeddingVector { EmbeddingVector::new(values.to_vec()) }

    #[test]
    fn nearest_orders_by_distance_then_slot() {
        let mut idx = VectorIndex::new(2);
        idx.push(Some(v(&[0.0, 1.0]))).unwrap();
        idx.push(Some(v(&[1.0, 0.0]))).unwrap();
        idx.push(None).unwrap();
        idx.push(Some(v(&[2.0, 0.0]))).unwrap();

        let hits = idx.nearest(&v(&[1.0, 0.0]), 10).unwrap();
        let slots: Vec<usize> = hits.iter().map(|h| h.0).collect();
        assert_eq!(slots, vec![1, 3, 0]);
        assert!(hits[0].1.abs() < 1e-6);
        assert!((hits[2].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_norm_vectors_have_zero_similarity() {
        let mut idx = VectorIndex::new(2);
        idx.push(Some(v(&[0.0, 0.0]))).unwrap();
        let hits = idx.nearest(&v(&[1.0, 1.0]), 1).unwrap();
        assert_eq!(hits[0].1, 1.0);
        let hits = idx.nearest(&v(&[0.0, 0.0]), 1).unwrap();
        assert_eq!(hits[0].1, 1.0);
    }

    #[test]
    fn argument_errors() {
        let mut idx = VectorIndex::new(2);
        assert!(matches!(idx.nearest(&v(&[1.0, 0.0]), 1), Err(Error::EmptyIndex)));
        idx.push(Some(v(&[1.0, 0.0]))).unwrap();
        assert!(matches!(idx.nearest(&v(&[1.0, 0.0]), 0), Err(Error::InvalidArgument(_))));
        assert!(matches!(idx.nearest(&v(&[1.0]), 1), Err(Error::Configuration(_))));
        assert!(matches!(idx.push(Some(v(&[1.0, 0.0, 0.0]))), Err(Error::Configuration(_))));
    }
}
