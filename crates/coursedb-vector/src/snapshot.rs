use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use coursedb_core::{Candidate, Course, EmbeddingVector, IdentityKey, Result, ScoredHit};

use crate::vector::VectorIndex;

/// One semantic candidate: the course and its cosine distance to the query.
#[derive(Debug, Clone, Copy)]
pub struct VectorHit<'s> {
    pub course: &'s Course,
    pub distance: f32,
}

impl Candidate for VectorHit<'_> {
    fn course(&self) -> &Course { self.course }
}

/// Courses plus their vectors, frozen at build time. Courses are held in
/// identity-key order and slot `i` of the vector index belongs to course `i`.
#[derive(Debug)]
pub struct SearchIndexSnapshot {
    courses: Vec<Course>,
    positions: HashMap<IdentityKey, usize>,
    index: VectorIndex,
}

impl SearchIndexSnapshot {
    pub fn empty(dim: usize) -> Self {
        Self { courses: Vec::new(), positions: HashMap::new(), index: VectorIndex::new(dim) }
    }

    /// Pairs courses with vectors by identity key. A vector of the wrong
    /// width is fatal; a vector with no course is dropped; a course with no
    /// vector stays searchable by keyword only.
    pub fn build(dim: usize, mut courses: Vec<Course>, embeddings: impl IntoIterator<Item = (IdentityKey, EmbeddingVector)>) -> Result<Self> {
        courses.sort_by(|a, b| a.cmp_key(b));
        courses.dedup_by(|b, a| a.same_key(b));

        let mut by_key: HashMap<IdentityKey, EmbeddingVector> = embeddings.into_iter().collect();
        let mut index = VectorIndex::new(dim);
        let mut positions = HashMap::with_capacity(courses.len());
        for course in &courses {
            let key = course.key();
            let slot = index.push(by_key.remove(&key))?;
            positions.insert(key, slot);
        }

        if !by_key.is_empty() {
            let mut orphans: Vec<&IdentityKey> = by_key.keys().collect();
            orphans.sort();
            warn!(count = orphans.len(), first = %orphans[0], "dropping vectors with no matching course");
        }
        let missing = courses.len() - index.vector_count();
        if missing > 0 {
            warn!(count = missing, "courses without a vector are keyword-searchable only");
        }
        info!(courses = courses.len(), vectors = index.vector_count(), dim, "built search index snapshot");
        Ok(Self { courses, positions, index })
    }

    pub fn dim(&self) -> usize { self.index.dim() }

    pub fn courses(&self) -> &[Course] { &self.courses }

    pub fn len(&self) -> usize { self.courses.len() }

    pub fn is_empty(&self) -> bool { self.courses.is_empty() }

    pub fn vector_count(&self) -> usize { self.index.vector_count() }

    pub fn missing_vectors(&self) -> usize { self.courses.len() - self.index.vector_count() }

    pub fn get(&self, key: &IdentityKey) -> Option<&Course> { self.positions.get(key).map(|&i| &self.courses[i]) }

    pub fn has_vector(&self, key: &IdentityKey) -> bool {
        self.positions.get(key).is_some_and(|&slot| self.index.has_vector(slot))
    }

    /// `k` nearest courses by cosine distance, ascending; ties by course id
    /// then term.
    pub fn search(&self, query: &EmbeddingVector, k: usize) -> Result<Vec<VectorHit<'_>>> {
        let hits = self.index.nearest(query, k)?;
        Ok(hits.into_iter().map(|(slot, distance)| VectorHit { course: &self.courses[slot], distance }).collect())
    }
}

/// Similarity `1 - distance`, min-max normalised over the given hits so the
/// best is `1.0`. If every hit is equally similar, all score `1.0`.
pub fn semantic_scores<'s>(hits: &[VectorHit<'s>]) -> Vec<ScoredHit<'s>> {
    let sims: Vec<f32> = hits.iter().map(|h| 1.0 - h.distance).collect();
    let max = sims.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let min = sims.iter().copied().fold(f32::INFINITY, f32::min);
    let range = max - min;
    hits.iter()
        .zip(sims)
        .map(|(hit, sim)| {
            let score = if range > f32::EPSILON { (sim - min) / range } else { 1.0 };
            ScoredHit { course: hit.course, score }
        })
        .collect()
}

/// The currently published snapshot. Readers clone the `Arc` and keep the
/// snapshot they started with; `publish` swaps the pointer under a short
/// write lock.
pub struct IndexHandle {
    current: RwLock<Arc<SearchIndexSnapshot>>,
}

impl IndexHandle {
    pub fn new(snapshot: SearchIndexSnapshot) -> Self { Self { current: RwLock::new(Arc::new(snapshot)) } }

    pub fn current(&self) -> Arc<SearchIndexSnapshot> { self.current.read().clone() }

    /// Replaces the snapshot and hands back the previous one.
    pub fn publish(&self, snapshot: SearchIndexSnapshot) -> Arc<SearchIndexSnapshot> {
        let next = Arc::new(snapshot);
        let previous = std::mem::replace(&mut *self.current.write(), next);
        info!(courses = self.current.read().len(), "published new search index snapshot");
        previous
    }
}
